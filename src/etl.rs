//! ETL loader: filesystem scan → documents → vector store.
//!
//! Scans the configured source directory, normalizes matching files into
//! [`Document`]s, and writes them into the (strictly resolved) vector
//! store in batches. The loader never runs without a vector store; that
//! requirement is enforced upstream by the dispatcher.

use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

use tracing::warn;

use crate::config::{EtlConfig, StackConfig};
use crate::models::Document;
use crate::traits::VectorStore;

/// Counters reported after a completed run.
#[derive(Debug, Default)]
pub struct EtlSummary {
    pub documents: usize,
    pub written: usize,
}

pub async fn run_etl_loader(
    config: &StackConfig,
    vectordb: Arc<dyn VectorStore>,
) -> Result<EtlSummary> {
    let etl = config
        .etl
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no [etl] section in config"))?;

    let docs = scan_source_dir(etl)?;
    let mut summary = EtlSummary {
        documents: docs.len(),
        written: 0,
    };

    for batch in docs.chunks(etl.batch_size) {
        summary.written += vectordb.add_documents(batch).await?;
    }

    println!("etl complete ({})", vectordb.name());
    println!("  documents scanned: {}", summary.documents);
    println!("  documents written: {}", summary.written);

    Ok(summary)
}

/// Scan `etl.source_dir` and normalize matching files into documents.
///
/// Results are sorted by relative path for deterministic ordering.
pub fn scan_source_dir(etl: &EtlConfig) -> Result<Vec<Document>> {
    let root = &etl.source_dir;
    if !root.exists() {
        bail!("ETL source directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&etl.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(etl.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut docs = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        if let Some(doc) = file_to_document(path, &rel_str)? {
            docs.push(doc);
        }
    }

    docs.sort_by(|a, b| a.source_path.cmp(&b.source_path));

    Ok(docs)
}

/// Returns `None` for files that cannot be read as UTF-8 text; they are
/// skipped rather than ingested with an empty body.
fn file_to_document(path: &Path, relative_path: &str) -> Result<Option<Document>> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified_secs = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) => {
            warn!(path = relative_path, "skipping unreadable source file: {e}");
            return Ok(None);
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let dedup_hash = format!("{:x}", hasher.finalize());

    let title = path.file_name().map(|n| n.to_string_lossy().to_string());

    Ok(Some(Document {
        id: Uuid::new_v4().to_string(),
        source_path: relative_path.to_string(),
        title,
        body,
        dedup_hash,
        updated_at: Utc
            .timestamp_opt(modified_secs, 0)
            .single()
            .unwrap_or_else(Utc::now),
    }))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
