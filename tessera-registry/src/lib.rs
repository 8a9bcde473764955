//! Versioned schema registry for Tessera.
//!
//! Tenants declare record shapes as JSON Schema documents. Each logical
//! schema (`schema_id`) keeps an append-only history of versions; exactly one
//! non-deleted version is active at a time and governs entity writes for the
//! schema's table.
//!
//! The single-active invariant is held by partial unique indexes in the
//! space, not by locks in this process: a writer that loses a race gets
//! [`Error::Conflict`](tessera_types::Error::Conflict) and is expected to
//! re-read and retry.

mod input;
pub mod lookup;
mod record;
mod registry;

pub use input::{CreateSchemaInput, MAX_TABLE_NAME_LEN, is_valid_table_name, normalize_slug};
pub use record::SchemaRecord;
pub use registry::SchemaRegistry;
