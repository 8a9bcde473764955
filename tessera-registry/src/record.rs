use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_schema::SemVer;
use tessera_types::{CategoryId, SchemaId};

/// One immutable version of a schema.
///
/// Only `is_active` and `is_soft_deleted` ever change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRecord {
    pub schema_id: SchemaId,
    pub version: SemVer,
    /// JSON Schema document entities of this version are validated against.
    pub definition: Value,
    pub table_name: String,
    pub slug: String,
    pub category_id: CategoryId,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub is_active: bool,
    pub is_soft_deleted: bool,
}

impl SchemaRecord {
    /// Active and not soft-deleted.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_soft_deleted
    }
}

/// Column list matching [`from_row`].
pub(crate) const COLUMNS: &str = "schema_id, version, definition, table_name, slug, \
     category_id, created_at, is_active, is_soft_deleted";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<SchemaRecord> {
    let schema_id: String = row.get(0)?;
    let version: String = row.get(1)?;
    let definition: String = row.get(2)?;
    Ok(SchemaRecord {
        schema_id: SchemaId::parse(&schema_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        version: SemVer::parse(&version)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        definition: serde_json::from_str(&definition)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        table_name: row.get(3)?,
        slug: row.get(4)?,
        category_id: CategoryId::new(row.get::<_, String>(5)?),
        created_at: row.get(6)?,
        is_active: row.get(7)?,
        is_soft_deleted: row.get(8)?,
    })
}
