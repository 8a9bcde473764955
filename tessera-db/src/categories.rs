//! The category taxonomy referenced by schemas.
//!
//! Categories are maintained by an external collaborator; these helpers are
//! the surface it (and tests) use to populate a space.

use crate::error::DbResult;
use rusqlite::{Connection, OptionalExtension, params};
use tessera_types::CategoryId;

/// Inserts a category or renames it, reviving it if it was soft-deleted.
pub fn upsert_category(conn: &Connection, id: &CategoryId, name: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO categories (id, name, is_deleted) VALUES (?1, ?2, 0)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, is_deleted = 0",
        params![id.as_str(), name],
    )?;
    Ok(())
}

/// Soft-deletes a category. Returns false if it did not exist or was already deleted.
pub fn soft_delete_category(conn: &Connection, id: &CategoryId) -> DbResult<bool> {
    let changed = conn.execute(
        "UPDATE categories SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
        params![id.as_str()],
    )?;
    Ok(changed > 0)
}

/// True when the category exists and is not soft-deleted.
pub fn category_is_live(conn: &Connection, id: &CategoryId) -> DbResult<bool> {
    let deleted: Option<bool> = conn
        .query_row(
            "SELECT is_deleted FROM categories WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(deleted == Some(false))
}
