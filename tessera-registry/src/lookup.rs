//! Read queries over `entity_schemas`, usable inside any open transaction.
//!
//! The entity store calls [`active_for_table`] from within its own unit of
//! work so that schema resolution and the entity write share one snapshot.

use crate::record::{COLUMNS, SchemaRecord, from_row};
use rusqlite::{Connection, OptionalExtension, params};
use tessera_db::DbResult;
use tessera_schema::SemVer;
use tessera_types::SchemaId;

/// The active, non-deleted version governing `table_name`.
pub fn active_for_table(conn: &Connection, table_name: &str) -> DbResult<Option<SchemaRecord>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM entity_schemas
         WHERE table_name = ?1 AND is_active = 1 AND is_soft_deleted = 0"
    );
    Ok(conn
        .query_row(&sql, params![table_name], from_row)
        .optional()?)
}

/// The active, non-deleted version of `schema_id`.
pub fn active_for_schema(conn: &Connection, schema_id: SchemaId) -> DbResult<Option<SchemaRecord>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM entity_schemas
         WHERE schema_id = ?1 AND is_active = 1 AND is_soft_deleted = 0"
    );
    Ok(conn
        .query_row(&sql, params![schema_id.to_string()], from_row)
        .optional()?)
}

/// One version, deleted or not.
pub fn find(conn: &Connection, schema_id: SchemaId, version: &SemVer) -> DbResult<Option<SchemaRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM entity_schemas WHERE schema_id = ?1 AND version = ?2");
    Ok(conn
        .query_row(
            &sql,
            params![schema_id.to_string(), version.to_string()],
            from_row,
        )
        .optional()?)
}

/// Every version of `schema_id`, soft-deleted ones included, in version order.
pub fn versions(conn: &Connection, schema_id: SchemaId) -> DbResult<Vec<SchemaRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM entity_schemas WHERE schema_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut records = stmt
        .query_map(params![schema_id.to_string()], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(records)
}

/// Every stored version across schemas, ordered by table name then version.
pub fn all(conn: &Connection, include_inactive: bool) -> DbResult<Vec<SchemaRecord>> {
    let filter = if include_inactive {
        ""
    } else {
        " WHERE is_active = 1 AND is_soft_deleted = 0"
    };
    let sql = format!("SELECT {COLUMNS} FROM entity_schemas{filter}");
    let mut stmt = conn.prepare(&sql)?;
    let mut records = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| {
        a.table_name
            .cmp(&b.table_name)
            .then_with(|| a.version.cmp(&b.version))
            .then_with(|| a.schema_id.cmp(&b.schema_id))
    });
    Ok(records)
}

/// Schema owning the most recently created version with `slug`, deleted or not.
pub(crate) fn latest_schema_with_slug(conn: &Connection, slug: &str) -> DbResult<Option<SchemaId>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT schema_id FROM entity_schemas WHERE slug = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![slug],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|s| {
        SchemaId::parse(&s)
            .map_err(|e| tessera_db::DbError::InvalidData(format!("schema_id {s:?}: {e}")))
    })
    .transpose()
}

/// The version a schema's identity (table name, slug) is pinned to: the
/// earliest created, ties broken by version.
pub(crate) fn first_version(history: &[SchemaRecord]) -> Option<&SchemaRecord> {
    history
        .iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.version.cmp(&b.version)))
}
