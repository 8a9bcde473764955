//! Core type definitions for Tessera.
//!
//! This crate holds the vocabulary shared by every layer of the engine:
//! - Schema and entity identifiers (UUID v7) and the opaque category reference
//! - The four-kind domain error taxonomy (`Validation`, `NotFound`, `Conflict`, `Internal`)
//! - An ordered field→messages map used to report every validation failure at once
//! - Millisecond wall-clock timestamps
//!
//! Nothing here performs I/O.

mod error;
mod ids;
mod timestamp;

pub use error::{Error, FieldErrors, Result};
pub use ids::{CategoryId, EntityId, SchemaId};
pub use timestamp::now_millis;
