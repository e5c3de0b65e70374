//! Basic retriever: top-k lookup against the optional vector store.
//!
//! A retriever constructed without a vector store is valid: it returns
//! no context rather than failing, so serving can proceed without
//! retrieval augmentation.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::ComponentSection;
use crate::models::ContextSnippet;
use crate::traits::{Retriever, VectorStore};

#[derive(Debug, Deserialize)]
struct BasicFields {
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    4
}

pub struct BasicRetriever {
    vectordb: Option<Arc<dyn VectorStore>>,
    top_k: usize,
}

/// Registry factory for `retriever.name = "basic"`.
pub fn factory(
    section: &ComponentSection,
    vectordb: Option<Arc<dyn VectorStore>>,
) -> Result<Arc<dyn Retriever>> {
    let fields: BasicFields = section.typed_fields()?;
    if fields.top_k == 0 {
        anyhow::bail!("retriever top_k must be > 0");
    }
    Ok(Arc::new(BasicRetriever {
        vectordb,
        top_k: fields.top_k,
    }))
}

#[async_trait]
impl Retriever for BasicRetriever {
    fn name(&self) -> &str {
        "basic"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<ContextSnippet>> {
        let store = match &self.vectordb {
            Some(store) => store,
            None => {
                debug!("no vector store resolved, returning empty context");
                return Ok(vec![]);
            }
        };

        let hits = store.search(query, self.top_k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| ContextSnippet {
                text: hit.text,
                score: hit.score,
                source: hit.source_path,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, SearchHit};

    struct OneHitStore;

    #[async_trait]
    impl VectorStore for OneHitStore {
        fn name(&self) -> &str {
            "onehit"
        }
        async fn add_documents(&self, docs: &[Document]) -> Result<usize> {
            Ok(docs.len())
        }
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
            assert_eq!(limit, 4);
            Ok(vec![SearchHit {
                id: "a".to_string(),
                score: 0.9,
                text: format!("context for {query}"),
                source_path: Some("alpha.md".to_string()),
            }])
        }
    }

    fn section() -> ComponentSection {
        ComponentSection {
            name: "basic".to_string(),
            fields: toml::Table::new(),
        }
    }

    #[tokio::test]
    async fn degrades_to_empty_context_without_store() {
        let retriever = factory(&section(), None).unwrap();
        let snippets = retriever.retrieve("anything").await.unwrap();
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn maps_hits_to_snippets() {
        let retriever = factory(&section(), Some(Arc::new(OneHitStore))).unwrap();
        let snippets = retriever.retrieve("rust").await.unwrap();
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "context for rust");
        assert_eq!(snippets[0].source.as_deref(), Some("alpha.md"));
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut fields = toml::Table::new();
        fields.insert("top_k".to_string(), toml::Value::Integer(0));
        let section = ComponentSection {
            name: "basic".to_string(),
            fields,
        };
        assert!(factory(&section, None).is_err());
    }
}
