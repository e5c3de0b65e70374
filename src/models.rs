//! Core data types flowing through the pipeline.
//!
//! These types cross the capability interfaces: documents written by the
//! ETL loader, hits returned by vector stores, snippets returned by
//! retrievers, and model predictions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document produced by the ETL loader and written into a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Path relative to the configured ETL source directory.
    pub source_path: String,
    pub title: Option<String>,
    pub body: String,
    pub dedup_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// A scored hit returned from a vector store search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub text: String,
    pub source_path: Option<String>,
}

/// A context snippet a retriever hands to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub text: String,
    pub score: f64,
    pub source: Option<String>,
}

/// Output of a single model prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Identifier of the model that produced the output.
    pub model: String,
    pub output: String,
}
