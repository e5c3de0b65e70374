//! Run-mode dispatch.
//!
//! Routes a resolved pipeline into one of the supported run modes:
//! serve a prebuilt model over HTTP, hand off to the custom model runner,
//! or run the ETL loader. Each CLI invocation traverses
//! config → resolution → dispatch exactly once; there are no retries.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::StackConfig;
use crate::error::StackError;
use crate::etl;
use crate::resolve::{resolve_pipeline, resolve_vectordb_strict, ModelResolution};
use crate::traits::{ComponentRegistry, Retriever};

/// Tagged result of a successfully dispatched CLI operation. Failures are
/// the `Err` side of the dispatch functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The serve-mode terminal call returned (prebuilt server or custom
    /// model runner finished).
    ServerStarted,
    EtlCompleted,
    InstallCompleted,
}

/// External collaborator invoked when `model.name` is the custom sentinel.
///
/// The engine's only responsibility is routing here exactly once per
/// invocation, forwarding the config, the possibly-none retriever, and the
/// config file path. What "running" means is entirely up to the
/// implementation.
#[async_trait]
pub trait CustomModelRunner: Send + Sync {
    async fn run(
        &self,
        config: &StackConfig,
        retriever: Option<Arc<dyn Retriever>>,
        config_path: &Path,
    ) -> anyhow::Result<()>;
}

/// Default custom runner: spawns the command declared in
/// `model.fields.command` and waits for it in the foreground.
///
/// The config file path is forwarded in the `GENAI_STACK_CONFIG`
/// environment variable so the spawned process can read the same document.
pub struct CommandRunner;

#[async_trait]
impl CustomModelRunner for CommandRunner {
    async fn run(
        &self,
        config: &StackConfig,
        _retriever: Option<Arc<dyn Retriever>>,
        config_path: &Path,
    ) -> anyhow::Result<()> {
        let command = config.model.field_str("command").ok_or_else(|| {
            anyhow::anyhow!("model.fields.command is required for the custom model path")
        })?;

        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("model.fields.command must not be empty"))?;

        info!(command, "running custom model");
        let status = tokio::process::Command::new(program)
            .args(parts)
            .env("GENAI_STACK_CONFIG", config_path)
            .status()
            .await
            .map_err(|e| anyhow::anyhow!("failed to spawn custom model command: {e}"))?;

        if !status.success() {
            anyhow::bail!("custom model command exited with {status}");
        }
        Ok(())
    }
}

/// `genai-stack start`: resolve the pipeline and serve the model.
pub async fn run_start(
    config: &StackConfig,
    registry: &ComponentRegistry,
    config_path: &Path,
) -> Result<RunOutcome, StackError> {
    run_start_with_runner(config, registry, config_path, &CommandRunner).await
}

/// Like [`run_start`], with an injectable custom model runner.
pub async fn run_start_with_runner(
    config: &StackConfig,
    registry: &ComponentRegistry,
    config_path: &Path,
    runner: &dyn CustomModelRunner,
) -> Result<RunOutcome, StackError> {
    let pipeline = resolve_pipeline(config, registry)?;

    match pipeline.model {
        ModelResolution::Custom => {
            info!("dispatching to custom model runner");
            runner
                .run(config, pipeline.retriever, config_path)
                .await
                .map_err(StackError::Other)?;
        }
        ModelResolution::Prebuilt(model) => {
            info!(model = model.name(), bind = %config.server.bind, "starting model HTTP server");
            // Terminal action: blocks for the process lifetime.
            crate::server::run_server(&config.server.bind, model)
                .await
                .map_err(StackError::Other)?;
        }
    }

    Ok(RunOutcome::ServerStarted)
}

/// `genai-stack etl`: strict vectordb resolution, then the batch load.
///
/// Deliberate asymmetry with serve mode: a vectordb that failed to
/// construct aborts the run with the original error instead of degrading.
pub async fn run_etl(
    config: &StackConfig,
    registry: &ComponentRegistry,
) -> Result<RunOutcome, StackError> {
    let vectordb = resolve_vectordb_strict(config, registry)?;
    let summary = etl::run_etl_loader(config, vectordb)
        .await
        .map_err(StackError::Other)?;
    info!(
        documents = summary.documents,
        written = summary.written,
        "ETL completed"
    );
    Ok(RunOutcome::EtlCompleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentSection, ServerConfig};
    use crate::models::ContextSnippet;
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubRetriever;

    #[async_trait]
    impl Retriever for StubRetriever {
        fn name(&self) -> &str {
            "stub"
        }
        async fn retrieve(&self, _q: &str) -> Result<Vec<ContextSnippet>> {
            Ok(vec![])
        }
    }

    fn stub_retriever(
        _: &ComponentSection,
        _vectordb: Option<Arc<dyn crate::traits::VectorStore>>,
    ) -> Result<Arc<dyn Retriever>> {
        Ok(Arc::new(StubRetriever))
    }

    /// Records every invocation and whether a retriever was forwarded.
    struct RecordingRunner {
        calls: AtomicUsize,
        retriever_present: Mutex<Option<bool>>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                retriever_present: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CustomModelRunner for RecordingRunner {
        async fn run(
            &self,
            _config: &StackConfig,
            retriever: Option<Arc<dyn Retriever>>,
            _config_path: &Path,
        ) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.retriever_present.lock().unwrap() = Some(retriever.is_some());
            Ok(())
        }
    }

    fn section(name: &str) -> ComponentSection {
        ComponentSection {
            name: name.to_string(),
            fields: toml::Table::new(),
        }
    }

    fn custom_config(retriever: Option<&str>) -> StackConfig {
        StackConfig {
            vectordb: None,
            retriever: retriever.map(section),
            model: section("custom"),
            server: ServerConfig::default(),
            etl: None,
        }
    }

    #[tokio::test]
    async fn custom_runner_invoked_exactly_once_with_retriever() {
        let mut registry = ComponentRegistry::new();
        registry.register_retriever("stub", stub_retriever);

        let runner = RecordingRunner::new();
        let outcome = run_start_with_runner(
            &custom_config(Some("stub")),
            &registry,
            &PathBuf::from("genai-stack.toml"),
            &runner,
        )
        .await
        .unwrap();

        assert_eq!(outcome, RunOutcome::ServerStarted);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*runner.retriever_present.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn custom_runner_receives_none_retriever_when_degraded() {
        // Empty registry: the "stub" retriever cannot resolve and degrades.
        let registry = ComponentRegistry::new();
        let runner = RecordingRunner::new();
        run_start_with_runner(
            &custom_config(Some("stub")),
            &registry,
            &PathBuf::from("genai-stack.toml"),
            &runner,
        )
        .await
        .unwrap();

        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*runner.retriever_present.lock().unwrap(), Some(false));
    }

    #[tokio::test]
    async fn etl_without_vectordb_section_is_fatal() {
        let registry = ComponentRegistry::new();
        let err = run_etl(&custom_config(None), &registry).await.unwrap_err();
        assert!(matches!(err, StackError::MissingRequiredDependency));
    }

    #[tokio::test]
    async fn etl_surfaces_vectordb_construction_error() {
        fn failing_store(
            _: &ComponentSection,
        ) -> Result<Arc<dyn crate::traits::VectorStore>> {
            anyhow::bail!("bad persistent_path")
        }
        let mut registry = ComponentRegistry::new();
        registry.register_vectordb("flaky", failing_store);

        let config = StackConfig {
            vectordb: Some(section("flaky")),
            retriever: None,
            model: section("custom"),
            server: ServerConfig::default(),
            etl: None,
        };

        let err = run_etl(&config, &registry).await.unwrap_err();
        match err {
            StackError::ComponentConstruction { source, .. } => {
                assert!(source.to_string().contains("bad persistent_path"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_prebuilt_model_aborts_start() {
        let registry = ComponentRegistry::new();
        let mut config = custom_config(None);
        config.model = section("gpt99");
        let err = run_start_with_runner(
            &config,
            &registry,
            &PathBuf::from("genai-stack.toml"),
            &RecordingRunner::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StackError::UnknownPrebuiltModel(_)));
    }
}
