//! ChromaDB vector store client (REST).
//!
//! Talks to a Chroma server over its v1 HTTP API. Construction only
//! validates the config fields and builds the HTTP client; the first
//! network round-trip happens on use.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ComponentSection;
use crate::models::{Document, SearchHit};
use crate::traits::VectorStore;

#[derive(Debug, Deserialize)]
struct ChromaFields {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_collection")]
    collection: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_collection() -> String {
    "genai-stack".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

pub struct ChromaStore {
    base_url: String,
    collection: String,
    client: reqwest::Client,
}

/// Registry factory for `vectordb.name = "chromadb"`.
pub fn factory(section: &ComponentSection) -> Result<Arc<dyn VectorStore>> {
    let fields: ChromaFields = section.typed_fields()?;
    if fields.host.trim().is_empty() {
        bail!("chromadb host must not be empty");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(fields.timeout_secs))
        .build()?;

    Ok(Arc::new(ChromaStore {
        base_url: format!("http://{}:{}/api/v1", fields.host, fields.port),
        collection: fields.collection,
        client,
    }))
}

impl ChromaStore {
    /// Get-or-create the configured collection and return its id.
    async fn collection_id(&self) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/collections", self.base_url))
            .json(&serde_json::json!({
                "name": self.collection,
                "get_or_create": true,
            }))
            .send()
            .await
            .context("chromadb collection request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("chromadb collection error {}: {}", status, body);
        }

        let json: serde_json::Value = resp.json().await?;
        json.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("chromadb collection response missing id"))
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn name(&self) -> &str {
        "chromadb"
    }

    async fn add_documents(&self, docs: &[Document]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }
        let collection_id = self.collection_id().await?;

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        let documents: Vec<&str> = docs.iter().map(|d| d.body.as_str()).collect();
        let metadatas: Vec<serde_json::Value> = docs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "source_path": d.source_path,
                    "title": d.title,
                    "dedup_hash": d.dedup_hash,
                    "updated_at": d.updated_at.to_rfc3339(),
                })
            })
            .collect();

        let resp = self
            .client
            .post(format!(
                "{}/collections/{}/add",
                self.base_url, collection_id
            ))
            .json(&serde_json::json!({
                "ids": ids,
                "documents": documents,
                "metadatas": metadatas,
            }))
            .send()
            .await
            .context("chromadb add request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("chromadb add error {}: {}", status, body);
        }

        Ok(docs.len())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let collection_id = self.collection_id().await?;

        let resp = self
            .client
            .post(format!(
                "{}/collections/{}/query",
                self.base_url, collection_id
            ))
            .json(&serde_json::json!({
                "query_texts": [query],
                "n_results": limit,
                "include": ["documents", "distances", "metadatas"],
            }))
            .send()
            .await
            .context("chromadb query request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("chromadb query error {}: {}", status, body);
        }

        let json: serde_json::Value = resp.json().await?;
        parse_query_response(&json)
    }
}

/// Chroma returns parallel arrays nested per query; we always send a
/// single query, so every field is indexed at `[0]`.
fn parse_query_response(json: &serde_json::Value) -> Result<Vec<SearchHit>> {
    let ids = json["ids"][0].as_array().cloned().unwrap_or_default();
    let docs = json["documents"][0].as_array().cloned().unwrap_or_default();
    let distances = json["distances"][0].as_array().cloned().unwrap_or_default();
    let metadatas = json["metadatas"][0].as_array().cloned().unwrap_or_default();

    let mut hits = Vec::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        let distance = distances.get(i).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let source_path = metadatas
            .get(i)
            .and_then(|m| m.get("source_path"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        hits.push(SearchHit {
            id: id.as_str().unwrap_or_default().to_string(),
            // Chroma reports a distance; invert so higher is better.
            score: 1.0 / (1.0 + distance),
            text: docs
                .get(i)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            source_path,
        });
    }
    Ok(hits)
}
