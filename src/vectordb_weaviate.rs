//! Weaviate vector store client (REST + GraphQL).
//!
//! Objects are written through the batch endpoint; search uses a BM25
//! GraphQL query so no vectorizer module is required on the server.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ComponentSection;
use crate::models::{Document, SearchHit};
use crate::traits::VectorStore;

#[derive(Debug, Deserialize)]
struct WeaviateFields {
    url: String,
    #[serde(default = "default_class_name")]
    class_name: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_class_name() -> String {
    "GenaiStackDocument".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

pub struct WeaviateStore {
    base_url: String,
    class_name: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

/// Registry factory for `vectordb.name = "weaviate"`.
pub fn factory(section: &ComponentSection) -> Result<Arc<dyn VectorStore>> {
    let fields: WeaviateFields = section.typed_fields()?;
    if fields.url.trim().is_empty() {
        bail!("weaviate url must not be empty");
    }
    if !fields.url.starts_with("http://") && !fields.url.starts_with("https://") {
        bail!("weaviate url must start with http:// or https://");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(fields.timeout_secs))
        .build()?;

    Ok(Arc::new(WeaviateStore {
        base_url: fields.url.trim_end_matches('/').to_string(),
        class_name: fields.class_name,
        api_key: fields.api_key,
        client,
    }))
}

impl WeaviateStore {
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    fn name(&self) -> &str {
        "weaviate"
    }

    async fn add_documents(&self, docs: &[Document]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let objects: Vec<serde_json::Value> = docs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "class": self.class_name,
                    "properties": {
                        "body": d.body,
                        "sourcePath": d.source_path,
                        "title": d.title,
                        "dedupHash": d.dedup_hash,
                        "updatedAt": d.updated_at.to_rfc3339(),
                    },
                })
            })
            .collect();

        let resp = self
            .request(
                self.client
                    .post(format!("{}/v1/batch/objects", self.base_url)),
            )
            .json(&serde_json::json!({ "objects": objects }))
            .send()
            .await
            .context("weaviate batch request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("weaviate batch error {}: {}", status, body);
        }

        Ok(docs.len())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let graphql = format!(
            r#"{{ Get {{ {class}(bm25: {{query: {query}}}, limit: {limit}) {{ body sourcePath _additional {{ id score }} }} }} }}"#,
            class = self.class_name,
            query = serde_json::Value::String(query.to_string()),
            limit = limit,
        );

        let resp = self
            .request(self.client.post(format!("{}/v1/graphql", self.base_url)))
            .json(&serde_json::json!({ "query": graphql }))
            .send()
            .await
            .context("weaviate graphql request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("weaviate graphql error {}: {}", status, body);
        }

        let json: serde_json::Value = resp.json().await?;
        if let Some(errors) = json.get("errors") {
            bail!("weaviate graphql errors: {}", errors);
        }

        parse_graphql_response(&json, &self.class_name)
    }
}

fn parse_graphql_response(json: &serde_json::Value, class_name: &str) -> Result<Vec<SearchHit>> {
    let objects = json["data"]["Get"][class_name]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let hits = objects
        .iter()
        .map(|obj| {
            let additional = &obj["_additional"];
            let score = additional["score"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .or_else(|| additional["score"].as_f64())
                .unwrap_or(0.0);
            SearchHit {
                id: additional["id"].as_str().unwrap_or_default().to_string(),
                score,
                text: obj["body"].as_str().unwrap_or_default().to_string(),
                source_path: obj["sourcePath"].as_str().map(str::to_string),
            }
        })
        .collect();

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(fields: toml::Table) -> ComponentSection {
        ComponentSection {
            name: "weaviate".to_string(),
            fields,
        }
    }

    #[test]
    fn factory_requires_url() {
        assert!(factory(&section(toml::Table::new())).is_err());
    }

    #[test]
    fn factory_rejects_schemeless_url() {
        let mut fields = toml::Table::new();
        fields.insert(
            "url".to_string(),
            toml::Value::String("localhost:8080".to_string()),
        );
        assert!(factory(&section(fields)).is_err());
    }

    #[test]
    fn factory_accepts_minimal_fields() {
        let mut fields = toml::Table::new();
        fields.insert(
            "url".to_string(),
            toml::Value::String("http://localhost:8080".to_string()),
        );
        let store = factory(&section(fields)).unwrap();
        assert_eq!(store.name(), "weaviate");
    }

    #[test]
    fn parses_graphql_response() {
        // Weaviate encodes BM25 scores as strings.
        let json = serde_json::json!({
            "data": { "Get": { "GenaiStackDocument": [
                {
                    "body": "alpha text",
                    "sourcePath": "alpha.md",
                    "_additional": { "id": "a", "score": "1.25" }
                }
            ]}}
        });
        let hits = parse_graphql_response(&json, "GenaiStackDocument").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].score, 1.25);
        assert_eq!(hits[0].source_path.as_deref(), Some("alpha.md"));
    }
}
