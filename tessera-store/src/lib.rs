//! Entity store for Tessera.
//!
//! Entities are JSON payloads filed under a table name. Every write resolves
//! the schema version currently active for the table, validates the payload
//! against it and stamps the record with that version. Records written under
//! older versions keep their stamp until they are next updated.

mod options;
mod record;
mod store;
mod validators;

pub use options::{EntityPage, ListOptions, PageLimits, SortOrder};
pub use record::EntityRecord;
pub use store::EntityStore;
