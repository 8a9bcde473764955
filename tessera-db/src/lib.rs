//! SQLite tenant space management for Tessera.
//!
//! A tenant space is one SQLite database file holding the schema registry,
//! the entity collections and the category taxonomy they reference. This
//! crate owns:
//! - opening a space (WAL journal, foreign keys, busy timeout) and applying
//!   the embedded migrations
//! - running units of work in a transaction under an [`OpContext`] that can
//!   carry a deadline or a cancel signal
//! - classifying SQLite failures (unique, primary key, foreign key, busy) so
//!   the layers above can translate them into domain errors
//!
//! Provisioning of spaces (creating files, credentials, pooling) belongs to
//! the caller.

pub mod categories;
mod context;
mod error;
mod migrations;
mod space;

pub use context::{CancelToken, OpContext};
pub use error::{Constraint, DbError, DbResult};
pub use migrations::{CURRENT_VERSION, applied_version};
pub use space::{Access, SpaceExecutor, SpaceOptions, SqliteSpace};

