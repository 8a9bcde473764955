//! Embedded schema migrations, applied in order when a space is opened.

use crate::error::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info};

/// Migration steps. Append only; never edit an applied step.
const MIGRATIONS: &[(i64, &str)] = &[
    (
        1,
        "
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS entity_schemas (
            schema_id TEXT NOT NULL,
            version TEXT NOT NULL,
            version_major INTEGER NOT NULL,
            version_minor INTEGER NOT NULL,
            version_patch INTEGER NOT NULL,
            definition TEXT NOT NULL,
            table_name TEXT NOT NULL,
            slug TEXT NOT NULL,
            category_id TEXT NOT NULL REFERENCES categories(id),
            created_at INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0,
            is_soft_deleted INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (schema_id, version)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS entity_schemas_one_active
            ON entity_schemas(schema_id)
            WHERE is_active = 1 AND is_soft_deleted = 0;

        CREATE UNIQUE INDEX IF NOT EXISTS entity_schemas_active_table
            ON entity_schemas(table_name)
            WHERE is_active = 1 AND is_soft_deleted = 0;

        CREATE UNIQUE INDEX IF NOT EXISTS entity_schemas_active_slug
            ON entity_schemas(slug)
            WHERE is_active = 1 AND is_soft_deleted = 0;

        CREATE INDEX IF NOT EXISTS entity_schemas_by_slug
            ON entity_schemas(slug, created_at);
        ",
    ),
    (
        2,
        "
        CREATE TABLE IF NOT EXISTS entities (
            entity_id TEXT PRIMARY KEY,
            table_name TEXT NOT NULL,
            payload TEXT NOT NULL,
            entity_schema_id TEXT NOT NULL,
            entity_schema_version TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_by TEXT,
            updated_by TEXT
        );

        CREATE INDEX IF NOT EXISTS entities_by_table
            ON entities(table_name, is_deleted, created_at);
        ",
    ),
];

/// Highest migration version this build knows.
pub const CURRENT_VERSION: i64 = 2;

/// Applies every migration newer than the space's recorded version.
pub(crate) fn apply(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )
    .map_err(|e| DbError::Migration(format!("failed to create migrations table: {e}")))?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = applied_version(&tx)?;
    if current > CURRENT_VERSION {
        return Err(DbError::Migration(format!(
            "space is at version {current}, newer than supported {CURRENT_VERSION}"
        )));
    }
    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        debug!(version, "Applying migration");
        tx.execute_batch(sql)
            .map_err(|e| DbError::Migration(format!("migration {version} failed: {e}")))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, tessera_types::now_millis()],
        )?;
    }
    tx.commit()?;
    if current < CURRENT_VERSION {
        info!(from = current, to = CURRENT_VERSION, "Space migrated");
    }
    Ok(())
}

/// Version recorded in `schema_migrations`, 0 for a fresh space.
pub fn applied_version(conn: &Connection) -> DbResult<i64> {
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}
