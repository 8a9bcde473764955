//! Compiled validators, one per schema version.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tessera_db::{DbError, DbResult};
use tessera_registry::SchemaRecord;
use tessera_schema::{SchemaValidator, SemVer};
use tessera_types::SchemaId;
use tracing::debug;

/// Schema versions are immutable, so an entry never goes stale.
///
/// Writes only validate against the active version, so caching a version
/// evicts the other versions of the same schema. At most one entry is held
/// per schema.
#[derive(Default)]
pub(crate) struct ValidatorCache {
    compiled: Mutex<HashMap<(SchemaId, SemVer), Arc<SchemaValidator>>>,
}

impl ValidatorCache {
    pub(crate) fn get(&self, schema: &SchemaRecord) -> DbResult<Arc<SchemaValidator>> {
        let key = (schema.schema_id, schema.version);
        if let Some(validator) = self.compiled.lock().map_err(|_| DbError::Poisoned)?.get(&key) {
            return Ok(Arc::clone(validator));
        }

        // Compile outside the lock; a racing compile of the same version is harmless.
        let validator = SchemaValidator::new(schema.schema_id, schema.version, &schema.definition)
            .map_err(|e| {
                DbError::InvalidData(format!(
                    "stored definition of schema {} version {} does not compile: {e}",
                    schema.schema_id, schema.version
                ))
            })?;
        debug!(schema_id = %schema.schema_id, version = %schema.version, "Compiled schema validator");
        let validator = Arc::new(validator);
        let mut compiled = self.compiled.lock().map_err(|_| DbError::Poisoned)?;
        compiled.retain(|(id, _), _| *id != schema.schema_id);
        compiled.insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    #[cfg(test)]
    pub(crate) fn cached_versions(&self) -> Vec<(SchemaId, SemVer)> {
        let mut keys: Vec<_> = self
            .compiled
            .lock()
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
