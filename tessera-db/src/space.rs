//! Tenant spaces and the executor interface the registry and store run on.

use crate::context::OpContext;
use crate::error::{DbError, DbResult};
use crate::migrations;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Whether a unit of work writes.
///
/// Writes take the database write lock up front (`BEGIN IMMEDIATE`), so two
/// writers never interleave inside one space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Executes units of work scoped to one tenant's isolated namespace.
///
/// `work` runs inside a transaction. It is committed only if `work` returns
/// `Ok` and `ctx` is still live; in every other case nothing is applied.
pub trait SpaceExecutor: Send + Sync {
    /// Identifier of the tenant space, for logging.
    fn space_id(&self) -> &str;

    fn execute<T, F>(&self, ctx: &OpContext, access: Access, work: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>;
}

/// Connection settings for a space.
#[derive(Debug, Clone)]
pub struct SpaceOptions {
    /// How long a writer waits for another writer before giving up.
    pub busy_timeout: Duration,
}

impl Default for SpaceOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// A tenant space backed by one SQLite database.
///
/// Several `SqliteSpace` handles may open the same file; they coordinate
/// through SQLite's locking only.
pub struct SqliteSpace {
    space_id: String,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSpace {
    /// Opens (or creates) the space at `path` and applies pending migrations.
    pub fn open(space_id: impl Into<String>, path: &Path, options: &SpaceOptions) -> DbResult<Self> {
        let space_id = space_id.into();
        let conn = Connection::open(path)?;
        let space = Self::init(space_id, conn, options)?;
        info!(space_id = %space.space_id, path = %path.display(), "Tenant space opened");
        Ok(space)
    }

    /// Opens a private in-memory space (for testing).
    pub fn open_in_memory(space_id: impl Into<String>) -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(space_id.into(), conn, &SpaceOptions::default())
    }

    fn init(space_id: String, mut conn: Connection, options: &SpaceOptions) -> DbResult<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(space_id = %space_id, journal_mode = %mode, "Journal mode set");
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::apply(&mut conn)?;
        Ok(Self {
            space_id,
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl SpaceExecutor for SqliteSpace {
    fn space_id(&self) -> &str {
        &self.space_id
    }

    fn execute<T, F>(&self, ctx: &OpContext, access: Access, work: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        ctx.check()?;
        let mut conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        let behavior = match access {
            Access::Read => TransactionBehavior::Deferred,
            Access::Write => TransactionBehavior::Immediate,
        };
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = work(&tx)?;
        // Dropping `tx` on any early return rolls it back.
        ctx.check()?;
        tx.commit()?;
        Ok(value)
    }
}

impl<E: SpaceExecutor> SpaceExecutor for Arc<E> {
    fn space_id(&self) -> &str {
        (**self).space_id()
    }

    fn execute<T, F>(&self, ctx: &OpContext, access: Access, work: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        (**self).execute(ctx, access, work)
    }
}
