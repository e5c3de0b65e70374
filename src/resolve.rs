//! Component resolution.
//!
//! Produces the ordered pipeline {vectordb?, retriever?, model} from a
//! loaded config, honoring dependency order and the partial-failure
//! policy: a vectordb or retriever that is missing, unknown, or fails to
//! construct degrades to `None` with a warning, while an unresolvable
//! model is always fatal.
//!
//! Resolution is synchronous and sequential: the retriever needs the
//! resolved vectordb and the model needs the resolved retriever, so there
//! is nothing to parallelize. There is no retry loop anywhere; each
//! invocation traverses the chain exactly once.

use std::sync::Arc;
use tracing::warn;

use crate::config::{ComponentSection, StackConfig, CUSTOM_MODEL_NAME};
use crate::error::{ComponentCategory, StackError};
use crate::traits::{ComponentRegistry, GenerativeModel, Retriever, VectorStore};

/// How the mandatory model section resolved.
pub enum ModelResolution {
    /// `model.name` equals the `custom` sentinel: the registry was
    /// bypassed and the dispatcher hands the retriever and config to the
    /// custom model runner.
    Custom,
    Prebuilt(Arc<dyn GenerativeModel>),
}

/// The resolved component graph for one invocation. Owned exclusively by
/// the run that created it; never shared across invocations.
pub struct ResolvedPipeline {
    pub vectordb: Option<Arc<dyn VectorStore>>,
    pub retriever: Option<Arc<dyn Retriever>>,
    pub model: ModelResolution,
}

/// Resolve the full pipeline for serve/custom dispatch.
///
/// Vectordb and retriever failures are recovered locally (logged and
/// degraded to `None`); model failures propagate. An identifier outside
/// the prebuilt set that is not the custom sentinel is
/// [`StackError::UnknownPrebuiltModel`], the one place an unresolved
/// component is a hard stop, because there is no sensible default model.
pub fn resolve_pipeline(
    config: &StackConfig,
    registry: &ComponentRegistry,
) -> Result<ResolvedPipeline, StackError> {
    let vectordb = resolve_vectordb(config, registry);
    let retriever = resolve_retriever(config, registry, vectordb.clone());

    let model_name = config.model.name.trim();
    if model_name == CUSTOM_MODEL_NAME {
        return Ok(ResolvedPipeline {
            vectordb,
            retriever,
            model: ModelResolution::Custom,
        });
    }

    if !registry.contains_model(model_name) {
        return Err(StackError::UnknownPrebuiltModel(model_name.to_string()));
    }
    let factory = registry.model(model_name)?;
    let model = factory(&config.model, retriever.clone()).map_err(|e| {
        StackError::ComponentConstruction {
            category: ComponentCategory::Model,
            identifier: model_name.to_string(),
            source: e,
        }
    })?;

    Ok(ResolvedPipeline {
        vectordb,
        retriever,
        model: ModelResolution::Prebuilt(model),
    })
}

/// Strict vectordb resolution for ETL mode.
///
/// Unlike [`resolve_pipeline`], failures here are never swallowed: ETL's
/// entire purpose is writing into the vector store. An absent section is
/// [`StackError::MissingRequiredDependency`]; lookup and construction
/// errors surface unchanged.
pub fn resolve_vectordb_strict(
    config: &StackConfig,
    registry: &ComponentRegistry,
) -> Result<Arc<dyn VectorStore>, StackError> {
    let section = config
        .vectordb
        .as_ref()
        .ok_or(StackError::MissingRequiredDependency)?;
    construct_vectordb(section, registry)
}

fn resolve_vectordb(
    config: &StackConfig,
    registry: &ComponentRegistry,
) -> Option<Arc<dyn VectorStore>> {
    let section = match &config.vectordb {
        Some(section) => section,
        None => {
            warn!("no [vectordb] section in config, continuing without a vector store");
            return None;
        }
    };
    match construct_vectordb(section, registry) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(vectordb = %section.name, "failed to initialize vectordb, continuing without one: {e}");
            None
        }
    }
}

fn resolve_retriever(
    config: &StackConfig,
    registry: &ComponentRegistry,
    vectordb: Option<Arc<dyn VectorStore>>,
) -> Option<Arc<dyn Retriever>> {
    let section = match &config.retriever {
        Some(section) => section,
        None => {
            warn!("no [retriever] section in config, continuing without a retriever");
            return None;
        }
    };
    let result = registry
        .retriever(section.name.trim())
        .and_then(|factory| {
            factory(section, vectordb).map_err(|e| StackError::ComponentConstruction {
                category: ComponentCategory::Retriever,
                identifier: section.name.clone(),
                source: e,
            })
        });
    match result {
        Ok(retriever) => Some(retriever),
        Err(e) => {
            warn!(retriever = %section.name, "failed to initialize retriever, continuing without one: {e}");
            None
        }
    }
}

fn construct_vectordb(
    section: &ComponentSection,
    registry: &ComponentRegistry,
) -> Result<Arc<dyn VectorStore>, StackError> {
    let factory = registry.vectordb(section.name.trim())?;
    factory(section).map_err(|e| StackError::ComponentConstruction {
        category: ComponentCategory::VectorDb,
        identifier: section.name.clone(),
        source: e,
    })
}
