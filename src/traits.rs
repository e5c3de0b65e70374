//! Capability interfaces and the component registry.
//!
//! The three capability traits ([`VectorStore`], [`Retriever`],
//! [`GenerativeModel`]) are the seams between the orchestration engine and
//! the concrete component catalog. The engine only ever looks components up
//! by `(category, identifier)` and knows nothing about how they work.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ComponentRegistry               │
//! │  ┌───────────┐ ┌───────────┐ ┌────────────┐  │
//! │  │ vectordb  │ │ retriever │ │   model    │  │
//! │  │ chromadb  │ │  basic    │ │ gpt3.5 ... │  │
//! │  │ weaviate  │ │           │ │ gpt4, hf   │  │
//! │  └───────────┘ └───────────┘ └────────────┘  │
//! └──────────────────┬───────────────────────────┘
//!                    ▼
//!        resolve_pipeline() → dispatch (serve | etl | custom)
//! ```
//!
//! Each map entry is a plain factory function reference known at compile
//! time; there is no reflection and no runtime loading. The registry is
//! populated once at startup and never mutated during a run.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ComponentSection;
use crate::error::{ComponentCategory, StackError};
use crate::models::{ContextSnippet, Document, Prediction, SearchHit};

// ═══════════════════════════════════════════════════════════════════════
// Capability traits
// ═══════════════════════════════════════════════════════════════════════

/// Embedding storage and lookup. Optional in the pipeline.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Registry identifier of this implementation (e.g. `"chromadb"`).
    fn name(&self) -> &str;

    /// Write a batch of documents into the store. Returns the number
    /// written.
    async fn add_documents(&self, docs: &[Document]) -> Result<usize>;

    /// Query the store for the `limit` closest matches.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Fetches relevant context for a prompt, optionally backed by a
/// [`VectorStore`].
///
/// A retriever constructed without a vector store is a valid, expected
/// state; it degrades to returning no context rather than failing.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    async fn retrieve(&self, query: &str) -> Result<Vec<ContextSnippet>>;
}

/// The terminal component: produces output, optionally using a
/// [`Retriever`]. Serving a resolved model over HTTP is the dispatcher's
/// job (`crate::server::run_server`), not the model's.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;

    /// The retriever this model was constructed with, if any. Used by the
    /// HTTP server to expose the retrieval endpoint.
    fn retriever(&self) -> Option<Arc<dyn Retriever>>;

    async fn predict(&self, prompt: &str) -> Result<Prediction>;
}

// ═══════════════════════════════════════════════════════════════════════
// Factories and registry
// ═══════════════════════════════════════════════════════════════════════

/// Constructs a vector store from its config section.
pub type VectorStoreFactory = fn(&ComponentSection) -> Result<Arc<dyn VectorStore>>;

/// Constructs a retriever from its config section and the already-resolved
/// (possibly absent) vector store.
pub type RetrieverFactory =
    fn(&ComponentSection, Option<Arc<dyn VectorStore>>) -> Result<Arc<dyn Retriever>>;

/// Constructs a prebuilt model from its config section and the
/// already-resolved (possibly absent) retriever.
pub type ModelFactory =
    fn(&ComponentSection, Option<Arc<dyn Retriever>>) -> Result<Arc<dyn GenerativeModel>>;

/// Static mapping from `(category, identifier)` to a factory.
///
/// Build it once at startup with [`ComponentRegistry::builtin`] (optionally
/// adding extensions with the `register_*` methods before first use) and
/// treat it as read-only afterwards. Lookups of unknown identifiers return
/// [`StackError::UnknownComponent`], never a panic.
pub struct ComponentRegistry {
    vectordbs: BTreeMap<String, VectorStoreFactory>,
    retrievers: BTreeMap<String, RetrieverFactory>,
    models: BTreeMap<String, ModelFactory>,
}

impl ComponentRegistry {
    /// Create an empty registry. Mostly useful in tests; production code
    /// starts from [`ComponentRegistry::builtin`].
    pub fn new() -> Self {
        Self {
            vectordbs: BTreeMap::new(),
            retrievers: BTreeMap::new(),
            models: BTreeMap::new(),
        }
    }

    /// Registry pre-loaded with the builtin component catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_vectordb("chromadb", crate::vectordb_chroma::factory);
        registry.register_vectordb("weaviate", crate::vectordb_weaviate::factory);
        registry.register_retriever("basic", crate::retriever_basic::factory);
        registry.register_model("gpt3.5", crate::model_openai::gpt35_factory);
        registry.register_model("gpt4", crate::model_openai::gpt4_factory);
        registry.register_model("hf", crate::model_hf::factory);
        registry
    }

    pub fn register_vectordb(&mut self, id: &str, factory: VectorStoreFactory) {
        self.vectordbs.insert(id.to_string(), factory);
    }

    pub fn register_retriever(&mut self, id: &str, factory: RetrieverFactory) {
        self.retrievers.insert(id.to_string(), factory);
    }

    pub fn register_model(&mut self, id: &str, factory: ModelFactory) {
        self.models.insert(id.to_string(), factory);
    }

    /// Look up a vector store factory by identifier.
    pub fn vectordb(&self, id: &str) -> Result<VectorStoreFactory, StackError> {
        self.vectordbs
            .get(id)
            .copied()
            .ok_or_else(|| StackError::UnknownComponent {
                category: ComponentCategory::VectorDb,
                identifier: id.to_string(),
            })
    }

    /// Look up a retriever factory by identifier.
    pub fn retriever(&self, id: &str) -> Result<RetrieverFactory, StackError> {
        self.retrievers
            .get(id)
            .copied()
            .ok_or_else(|| StackError::UnknownComponent {
                category: ComponentCategory::Retriever,
                identifier: id.to_string(),
            })
    }

    /// Look up a prebuilt model factory by identifier.
    pub fn model(&self, id: &str) -> Result<ModelFactory, StackError> {
        self.models
            .get(id)
            .copied()
            .ok_or_else(|| StackError::UnknownComponent {
                category: ComponentCategory::Model,
                identifier: id.to_string(),
            })
    }

    /// Whether `id` names a prebuilt model.
    pub fn contains_model(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Prebuilt model identifiers in stable order (for `list-models`).
    pub fn model_ids(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullStore;

    #[async_trait]
    impl VectorStore for NullStore {
        fn name(&self) -> &str {
            "null"
        }
        async fn add_documents(&self, docs: &[Document]) -> Result<usize> {
            Ok(docs.len())
        }
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
            Ok(vec![])
        }
    }

    fn null_store(_: &ComponentSection) -> Result<Arc<dyn VectorStore>> {
        Ok(Arc::new(NullStore))
    }

    #[test]
    fn lookup_finds_registered_factory() {
        let mut registry = ComponentRegistry::new();
        registry.register_vectordb("null", null_store);
        assert!(registry.vectordb("null").is_ok());
    }

    #[test]
    fn unknown_identifier_is_an_error_not_a_panic() {
        let registry = ComponentRegistry::new();
        let err = registry.vectordb("missing").unwrap_err();
        match err {
            StackError::UnknownComponent {
                category,
                identifier,
            } => {
                assert_eq!(category, ComponentCategory::VectorDb);
                assert_eq!(identifier, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.retriever("missing").is_err());
        assert!(registry.model("missing").is_err());
    }

    #[test]
    fn builtin_catalog_is_populated() {
        let registry = ComponentRegistry::builtin();
        assert!(registry.vectordb("chromadb").is_ok());
        assert!(registry.vectordb("weaviate").is_ok());
        assert!(registry.retriever("basic").is_ok());
        assert_eq!(registry.model_ids(), vec!["gpt3.5", "gpt4", "hf"]);
        assert!(registry.contains_model("gpt3.5"));
        assert!(!registry.contains_model("custom"));
    }
}
