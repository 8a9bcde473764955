use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_schema::SemVer;
use tessera_types::{EntityId, SchemaId};

/// A stored entity.
///
/// `payload` conformed to the schema version in `entity_schema_version` when
/// it was written; the stamp is not re-derived later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub entity_id: EntityId,
    pub table_name: String,
    pub payload: Value,
    pub entity_schema_id: SchemaId,
    pub entity_schema_version: SemVer,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl EntityRecord {
    /// Extract a string value from `payload` using a JSON pointer (e.g., "/title").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.payload.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a boolean value from `payload` using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.payload.pointer(pointer).and_then(|v| v.as_bool())
    }

    /// Extract a numeric value from `payload` using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.payload.pointer(pointer).and_then(|v| v.as_f64())
    }
}

pub(crate) const COLUMNS: &str = "entity_id, table_name, payload, entity_schema_id, \
     entity_schema_version, created_at, updated_at, deleted_at, is_deleted, created_by, updated_by";

fn conversion<E>(column: usize) -> impl FnOnce(E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<EntityRecord> {
    let entity_id: String = row.get(0)?;
    let payload: String = row.get(2)?;
    let schema_id: String = row.get(3)?;
    let version: String = row.get(4)?;
    Ok(EntityRecord {
        entity_id: EntityId::parse(&entity_id).map_err(conversion(0))?,
        table_name: row.get(1)?,
        payload: serde_json::from_str(&payload).map_err(conversion(2))?,
        entity_schema_id: SchemaId::parse(&schema_id).map_err(conversion(3))?,
        entity_schema_version: SemVer::parse(&version).map_err(conversion(4))?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted_at: row.get(7)?,
        is_deleted: row.get(8)?,
        created_by: row.get(9)?,
        updated_by: row.get(10)?,
    })
}
