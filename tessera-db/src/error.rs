//! Error types for the space layer.

use rusqlite::ErrorCode;
use thiserror::Error;
use tracing::error;

/// Result type for space operations.
pub type DbResult<T> = Result<T, DbError>;

// Extended result codes (sqlite3.h).
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// Errors that can occur while running work inside a tenant space.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A stored row could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another thread panicked while holding the connection.
    #[error("connection lock poisoned")]
    Poisoned,

    /// Deadline passed or cancel requested; the transaction was rolled back.
    #[error("operation cancelled")]
    Cancelled,

    /// A domain error raised by the unit of work itself.
    #[error(transparent)]
    Domain(#[from] tessera_types::Error),
}

/// What kind of constraint a failed statement violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// A unique index, with the indexed columns.
    Unique(Vec<String>),
    /// The primary key, with its columns.
    PrimaryKey(Vec<String>),
    ForeignKey,
    /// Another writer held the database past the busy timeout.
    Busy,
}

impl DbError {
    /// Classifies a constraint or locking failure, `None` for anything else.
    #[must_use]
    pub fn constraint(&self) -> Option<Constraint> {
        let DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, message)) = self else {
            return None;
        };
        match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Some(Constraint::Busy),
            ErrorCode::ConstraintViolation => {
                let columns = || failed_columns(message.as_deref().unwrap_or_default());
                match failure.extended_code {
                    SQLITE_CONSTRAINT_UNIQUE => Some(Constraint::Unique(columns())),
                    SQLITE_CONSTRAINT_PRIMARYKEY => Some(Constraint::PrimaryKey(columns())),
                    SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Maps the failures every layer treats alike into the domain taxonomy:
    /// domain errors pass through, cancellation stays cancellation, lock
    /// contention is a conflict, and anything else is logged and reported as
    /// an opaque internal error.
    ///
    /// Callers translate the constraint violations they understand first.
    #[must_use]
    pub fn into_domain(self, operation: &str) -> tessera_types::Error {
        match self {
            DbError::Domain(e) => e,
            DbError::Cancelled => tessera_types::Error::Cancelled,
            other => {
                if other.constraint() == Some(Constraint::Busy) {
                    return tessera_types::Error::conflict(format!(
                        "{operation}: concurrent writer holds the space, retry"
                    ));
                }
                error!(operation, error = %other, "Storage failure");
                tessera_types::Error::Internal(format!("{operation} failed"))
            }
        }
    }
}

/// Column names from `UNIQUE constraint failed: t.a, t.b`.
fn failed_columns(message: &str) -> Vec<String> {
    let Some((_, list)) = message.split_once(": ") else {
        return Vec::new();
    };
    list.split(',')
        .map(|qualified| {
            let qualified = qualified.trim();
            qualified
                .rsplit_once('.')
                .map_or(qualified, |(_, column)| column)
                .to_string()
        })
        .collect()
}
