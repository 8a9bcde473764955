//! Schema-side building blocks for Tessera.
//!
//! - [`SemVer`]: `MAJOR.MINOR.PATCH` versions with numeric ordering and the
//!   next-version rule used when a caller omits an explicit version.
//! - [`CompiledSchema`]: an interpreter for the JSON Schema (Draft 2020-12)
//!   subset the engine supports. Definitions are compiled once and then
//!   evaluated against payloads at write time.
//! - [`SchemaValidator`] / [`ValidatedPayload`]: a compiled schema bound to the
//!   `(schema_id, version)` it belongs to, and the schema-tagged documents it
//!   produces. The entity store only persists `ValidatedPayload`s.
//!
//! This crate is pure: no I/O, no global state.

mod format;
mod payload;
mod validator;
mod version;

pub use payload::{SchemaValidator, ValidatedPayload};
pub use validator::{
    CompileError, CompileIssue, CompiledSchema, ROOT_PATH, ValidationIssue, to_field_errors,
};
pub use version::{SemVer, VersionError};
