//! TOML configuration parsing and validation.
//!
//! The configuration document is loaded once per CLI invocation and is
//! immutable thereafter. Component sections (`[vectordb]`, `[retriever]`,
//! `[model]`) name an implementation and carry an open `fields` table the
//! engine never interprets; each factory deserializes its own fields.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::StackError;

/// Reserved model identifier that routes to the custom-model path,
/// bypassing the registry entirely.
pub const CUSTOM_MODEL_NAME: &str = "custom";

/// File written when no `--config_file` is provided.
pub const DEFAULT_CONFIG_PATH: &str = "./genai-stack.toml";

const DEFAULT_CONFIG_TOML: &str = r#"# Default config generated by genai-stack.
# Point --config_file at your own file to override.

[model]
name = "gpt3.5"

[retriever]
name = "basic"

# [vectordb]
# name = "chromadb"
# [vectordb.fields]
# host = "localhost"
# port = 8000
# collection = "genai-stack"

[server]
bind = "127.0.0.1:8082"
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct StackConfig {
    /// Optional; resolution degrades to no vector store when absent.
    #[serde(default)]
    pub vectordb: Option<ComponentSection>,
    /// Optional; resolution degrades to no retriever when absent.
    #[serde(default)]
    pub retriever: Option<ComponentSection>,
    /// Mandatory. Either a prebuilt identifier or the `custom` sentinel.
    pub model: ComponentSection,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub etl: Option<EtlConfig>,
}

/// One component section: an implementation identifier plus an open
/// table of implementation-specific fields.
#[derive(Debug, Deserialize, Clone)]
pub struct ComponentSection {
    pub name: String,
    #[serde(default)]
    pub fields: toml::Table,
}

impl ComponentSection {
    /// Returns a string-typed field, if present.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Deserialize the open `fields` table into a factory's typed config.
    pub fn typed_fields<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let value = toml::Value::Table(self.fields.clone());
        value
            .try_into()
            .map_err(|e| anyhow::anyhow!("invalid fields for '{}': {}", self.name, e))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8082".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EtlConfig {
    /// Directory scanned for source documents.
    pub source_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Documents per `add_documents` call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

fn default_batch_size() -> usize {
    32
}

/// Load and validate a configuration document.
///
/// Any read, parse, or validation failure is a fatal
/// [`StackError::Config`], surfaced before resolution begins.
pub fn load_config(path: &Path) -> Result<StackConfig, StackError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StackError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    let config: StackConfig = toml::from_str(&content)
        .map_err(|e| StackError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    // Identifier invariant: present sections must name an implementation.
    if config.model.name.trim().is_empty() {
        return Err(StackError::Config("model.name must not be empty".to_string()));
    }
    for (section, label) in [(&config.vectordb, "vectordb"), (&config.retriever, "retriever")] {
        if let Some(s) = section {
            if s.name.trim().is_empty() {
                return Err(StackError::Config(format!("{label}.name must not be empty")));
            }
        }
    }

    if let Some(etl) = &config.etl {
        if etl.batch_size == 0 {
            return Err(StackError::Config("etl.batch_size must be > 0".to_string()));
        }
    }

    Ok(config)
}

/// Ensure a default config file exists and return its path.
///
/// Used when `--config_file` is omitted. An existing file is reused
/// rather than overwritten.
pub fn write_default_config() -> Result<PathBuf, StackError> {
    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        info!(path = %path.display(), "reusing existing default config");
        return Ok(path);
    }
    std::fs::write(&path, DEFAULT_CONFIG_TOML)?;
    info!(path = %path.display(), "wrote default config");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("genai-stack.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn parses_full_config() {
        let (_tmp, path) = write_config(
            r#"
[vectordb]
name = "chromadb"
[vectordb.fields]
host = "localhost"
port = 8000

[retriever]
name = "basic"

[model]
name = "gpt3.5"

[server]
bind = "0.0.0.0:9000"

[etl]
source_dir = "./data"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.vectordb.as_ref().unwrap().name, "chromadb");
        assert_eq!(
            cfg.vectordb.as_ref().unwrap().field_str("host"),
            Some("localhost")
        );
        assert_eq!(cfg.retriever.as_ref().unwrap().name, "basic");
        assert_eq!(cfg.model.name, "gpt3.5");
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.etl.as_ref().unwrap().batch_size, 32);
    }

    #[test]
    fn model_section_is_mandatory() {
        let (_tmp, path) = write_config("[retriever]\nname = \"basic\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, StackError::Config(_)), "got: {err}");
    }

    #[test]
    fn vectordb_and_retriever_are_optional() {
        let (_tmp, path) = write_config("[model]\nname = \"gpt3.5\"\n");
        let cfg = load_config(&path).unwrap();
        assert!(cfg.vectordb.is_none());
        assert!(cfg.retriever.is_none());
        assert_eq!(cfg.server.bind, "127.0.0.1:8082");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let (_tmp, path) = write_config("[model]\nname = \"  \"\n");
        assert!(load_config(&path).is_err());

        let (_tmp, path) = write_config("[model]\nname = \"gpt3.5\"\n[vectordb]\nname = \"\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = load_config(Path::new("/nonexistent/genai-stack.toml")).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }

    #[test]
    fn default_config_template_parses() {
        let (_tmp, path) = write_config(DEFAULT_CONFIG_TOML);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.model.name, "gpt3.5");
        assert_eq!(cfg.retriever.as_ref().unwrap().name, "basic");
    }

    #[test]
    fn typed_fields_roundtrip() {
        #[derive(serde::Deserialize)]
        struct Fields {
            host: String,
            port: u16,
        }
        let (_tmp, path) = write_config(
            "[model]\nname = \"gpt3.5\"\n[vectordb]\nname = \"chromadb\"\n[vectordb.fields]\nhost = \"h\"\nport = 1234\n",
        );
        let cfg = load_config(&path).unwrap();
        let fields: Fields = cfg.vectordb.as_ref().unwrap().typed_fields().unwrap();
        assert_eq!(fields.host, "h");
        assert_eq!(fields.port, 1234);
    }
}
