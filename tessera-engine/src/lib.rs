//! Tessera: schema-versioned generic entity persistence.
//!
//! This crate wires the pieces together for embedders:
//! [`EngineConfig`] (TOML-loadable settings), [`init_tracing`] for log
//! output, and [`Engine`], which opens a tenant space and hands out the
//! [`SchemaRegistry`] and [`EntityStore`] that share it.

mod config;
mod engine;
mod logging;

pub use config::{ConfigError, EngineConfig, IN_MEMORY};
pub use engine::{Engine, EngineError};
pub use logging::init_tracing;

pub use tessera_db::{CancelToken, OpContext};
pub use tessera_registry::{CreateSchemaInput, SchemaRecord, SchemaRegistry};
pub use tessera_store::{EntityPage, EntityRecord, EntityStore, ListOptions, PageLimits, SortOrder};
pub use tessera_types::{CategoryId, EntityId, Error, FieldErrors, Result, SchemaId};
