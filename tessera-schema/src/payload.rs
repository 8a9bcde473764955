//! Schema-tagged documents.

use crate::validator::{CompileError, CompiledSchema, ValidationIssue};
use crate::version::SemVer;
use serde_json::Value;
use tessera_types::SchemaId;

/// A compiled definition bound to the schema version it came from.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema_id: SchemaId,
    version: SemVer,
    compiled: CompiledSchema,
}

impl SchemaValidator {
    pub fn new(schema_id: SchemaId, version: SemVer, definition: &Value) -> Result<Self, CompileError> {
        Ok(Self {
            schema_id,
            version,
            compiled: CompiledSchema::compile(definition)?,
        })
    }

    #[must_use]
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    #[must_use]
    pub fn version(&self) -> SemVer {
        self.version
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledSchema {
        &self.compiled
    }

    /// Validates `payload` and, on success, tags it with this schema version.
    pub fn validate(&self, payload: Value) -> Result<ValidatedPayload, Vec<ValidationIssue>> {
        self.compiled.validate(&payload)?;
        Ok(ValidatedPayload {
            schema_id: self.schema_id,
            schema_version: self.version,
            value: payload,
        })
    }
}

/// A payload that passed validation against a specific schema version.
///
/// Only [`SchemaValidator::validate`] constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayload {
    schema_id: SchemaId,
    schema_version: SemVer,
    value: Value,
}

impl ValidatedPayload {
    #[must_use]
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    #[must_use]
    pub fn schema_version(&self) -> SemVer {
        self.schema_version
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}
