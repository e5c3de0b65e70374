//! # GenAI Stack CLI (`genai-stack`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `genai-stack start` | Resolve the pipeline and serve the model over HTTP |
//! | `genai-stack etl` | Batch-load documents into the configured vector store |
//! | `genai-stack list-models` | List the prebuilt model identifiers |
//! | `genai-stack install` | Install a stack component via its platform installer |
//!
//! ## Examples
//!
//! ```bash
//! # Serve the configured model (generates a default config if omitted)
//! genai-stack start --config_file ./genai-stack.toml
//!
//! # Load ./data into the configured vector store
//! genai-stack etl --config_file ./genai-stack.toml
//!
//! # See what can be installed
//! genai-stack install --list-components
//!
//! # Run a local ChromaDB
//! genai-stack install --component vectordb --subcomponent chromadb --quickstart
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use genai_stack::config;
use genai_stack::dispatch;
use genai_stack::install;
use genai_stack::traits::ComponentRegistry;

/// GenAI Stack: a configuration-driven orchestrator for GenAI pipelines.
///
/// A TOML config names a vectordb, a retriever, and a model; `start`
/// serves the resolved model over HTTP and `etl` batch-loads documents
/// into the vector store.
#[derive(Parser)]
#[command(
    name = "genai-stack",
    about = "GenAI Stack: assemble vector stores, retrievers, and models from one config",
    version,
    long_about = "GenAI Stack resolves a pipeline of named, swappable components (vector \
    store, retriever, generative model) from a declarative TOML config and dispatches it \
    into one of the run modes: serve an HTTP endpoint, run a batch ETL load, or hand off \
    to a user-supplied custom model."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server for the configured model.
    ///
    /// Resolves vectordb → retriever → model. A vectordb or retriever
    /// that fails to initialize is logged and skipped; a model that
    /// cannot be resolved aborts the run.
    Start {
        /// Path to the configuration file (TOML). A default file is
        /// generated when omitted.
        #[arg(long = "config_file")]
        config_file: Option<PathBuf>,
    },

    /// Run a batch ETL load into the configured vector store.
    ///
    /// Unlike `start`, this requires a working `[vectordb]` section and
    /// aborts with the original error when it cannot be constructed.
    Etl {
        /// Path to the configuration file (TOML). A default file is
        /// generated when omitted.
        #[arg(long = "config_file")]
        config_file: Option<PathBuf>,
    },

    /// List available prebuilt models.
    ListModels,

    /// Install a stack component via its platform installer.
    Install {
        /// Component to install (e.g. `vectordb`, `etl`).
        #[arg(long)]
        component: Option<String>,

        /// Subcomponent to install (e.g. `chromadb`, `airbyte`).
        #[arg(long)]
        subcomponent: Option<String>,

        /// List all components and subcomponents available.
        #[arg(long)]
        list_components: bool,

        /// Use recipe defaults without an options file.
        #[arg(long)]
        quickstart: bool,

        /// JSON file with install options (target_dir, env).
        #[arg(long = "config-file")]
        config_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = ComponentRegistry::builtin();

    match cli.command {
        Commands::Start { config_file } => {
            let path = resolve_config_path(config_file)?;
            let cfg = config::load_config(&path)?;
            dispatch::run_start(&cfg, &registry, &path).await?;
        }
        Commands::Etl { config_file } => {
            let path = resolve_config_path(config_file)?;
            let cfg = config::load_config(&path)?;
            dispatch::run_etl(&cfg, &registry).await?;
        }
        Commands::ListModels => {
            println!("Available prebuilt models\n");
            for (i, id) in registry.model_ids().iter().enumerate() {
                println!("{}. {}", i + 1, id);
            }
            println!(
                "\nSet model.name = \"{}\" to serve your own model instead.",
                config::CUSTOM_MODEL_NAME
            );
        }
        Commands::Install {
            component,
            subcomponent,
            list_components,
            quickstart,
            config_file,
        } => {
            if list_components {
                install::print_components();
            }
            match (component, subcomponent) {
                (Some(component), Some(subcomponent)) => {
                    let options = match (&config_file, quickstart) {
                        (Some(path), _) => install::InstallOptions::from_json_file(path)?,
                        (None, true) => install::InstallOptions::default(),
                        (None, false) => anyhow::bail!(
                            "pass --quickstart or --config-file to install {component}/{subcomponent}"
                        ),
                    };
                    install::run_install(&component, &subcomponent, &options)?;
                }
                (None, None) if list_components => {}
                _ => anyhow::bail!(
                    "pass --component and --subcomponent together, or --list-components"
                ),
            }
        }
    }

    Ok(())
}

/// Resolve the config file path, generating a default document when the
/// flag is omitted.
fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => {
            warn!("no config file provided, using a generated default");
            Ok(config::write_default_config()?)
        }
    }
}
