//! Error taxonomy for component resolution and mode dispatch.
//!
//! Whether an error is fatal is a property of the call site, not the type:
//! the resolution engine catches vectordb/retriever failures and degrades,
//! while model and ETL failures propagate to `main` untouched.

use thiserror::Error;

/// The three component categories a registry lookup can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentCategory {
    VectorDb,
    Retriever,
    Model,
}

impl std::fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentCategory::VectorDb => "vectordb",
            ComponentCategory::Retriever => "retriever",
            ComponentCategory::Model => "model",
        };
        f.write_str(s)
    }
}

/// Errors produced by the orchestration engine.
#[derive(Debug, Error)]
pub enum StackError {
    /// The identifier is not present in the registry for its category.
    #[error("Unknown {category} component '{identifier}'")]
    UnknownComponent {
        category: ComponentCategory,
        identifier: String,
    },

    /// A registered factory was found but failed to produce a component.
    #[error("Failed to initialize {category} '{identifier}': {source}")]
    ComponentConstruction {
        category: ComponentCategory,
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// The configured model is neither the custom sentinel nor a member of
    /// the prebuilt set. There is no sensible default model, so this is
    /// always fatal.
    #[error(
        "Unknown prebuilt model '{0}'. Run `genai-stack list-models` for the prebuilt set, \
         or set model.name = \"custom\" to serve your own"
    )]
    UnknownPrebuiltModel(String),

    /// ETL was invoked without a `[vectordb]` section. ETL's entire purpose
    /// is writing into the vector store, so there is nothing to degrade to.
    #[error("ETL requires a [vectordb] section in the config")]
    MissingRequiredDependency,

    /// The configuration document could not be read, parsed, or validated.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
