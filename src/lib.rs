//! # GenAI Stack
//!
//! A configuration-driven orchestrator for GenAI pipelines: a declarative
//! TOML document names a vector store, a retriever, and a generative
//! model; the engine resolves them in dependency order and dispatches
//! into one of the run modes (serve, ETL, custom model).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌─────────────────┐
//! │ StackConfig  │──▶│ Resolution     │──▶│ Mode dispatch    │
//! │ (TOML)       │   │ vdb? → ret? →  │   │ serve | etl |    │
//! │              │   │ model          │   │ custom           │
//! └──────────────┘   └───────┬────────┘   └─────────────────┘
//!                            │ lookups
//!                    ┌───────▼────────┐
//!                    │ ComponentReg.  │
//!                    │ chromadb, ...  │
//!                    └────────────────┘
//! ```
//!
//! Vectordb and retriever failures degrade to absent components with a
//! warning; model and ETL-dependency failures are fatal.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and the default document |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`traits`] | Capability interfaces and the component registry |
//! | [`resolve`] | Resolution engine |
//! | [`dispatch`] | Run-mode dispatch and the custom model runner |
//! | [`server`] | HTTP serving shell |
//! | [`etl`] | Batch load into a vector store |
//! | [`install`] | Install orchestrator |
//! | [`vectordb_chroma`] / [`vectordb_weaviate`] | Vector store clients |
//! | [`retriever_basic`] | Top-k retriever |
//! | [`model_openai`] / [`model_hf`] | Prebuilt models |

pub mod config;
pub mod dispatch;
pub mod error;
pub mod etl;
pub mod install;
pub mod model_hf;
pub mod model_openai;
pub mod models;
pub mod resolve;
pub mod retriever_basic;
pub mod server;
pub mod traits;
pub mod vectordb_chroma;
pub mod vectordb_weaviate;
