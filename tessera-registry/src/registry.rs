//! The schema registry service.

use crate::input::{Checked, CreateSchemaInput};
use crate::lookup;
use crate::record::SchemaRecord;
use rusqlite::{Connection, params};
use std::sync::Arc;
use tessera_db::categories::category_is_live;
use tessera_db::{Access, Constraint, DbError, DbResult, OpContext, SpaceExecutor, SqliteSpace};
use tessera_schema::SemVer;
use tessera_types::{Error, FieldErrors, Result, SchemaId, now_millis};
use tracing::{debug, info};

/// Versioned schema registry over one tenant space.
///
/// Cheap to clone; clones share the space handle.
pub struct SchemaRegistry<E: SpaceExecutor = SqliteSpace> {
    space: Arc<E>,
}

impl<E: SpaceExecutor> Clone for SchemaRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            space: Arc::clone(&self.space),
        }
    }
}

impl<E: SpaceExecutor> SchemaRegistry<E> {
    pub fn new(space: Arc<E>) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &Arc<E> {
        &self.space
    }

    /// Creates a schema version and makes it the active one.
    ///
    /// Structural problems with `input` are reported together before the space
    /// is touched. Resolution of the schema id and version, the identity
    /// check against the first version and the activation swap then run in
    /// one write transaction.
    pub fn create(&self, ctx: &OpContext, input: CreateSchemaInput) -> Result<SchemaRecord> {
        let checked = input.check().map_err(Error::Validation)?;
        let record = self
            .space
            .execute(ctx, Access::Write, |tx| {
                insert_version(tx, ctx, &input, &checked)
            })
            .map_err(|e| write_error(e, "create schema"))?;
        info!(
            space = self.space.space_id(),
            schema_id = %record.schema_id,
            version = %record.version,
            table = %record.table_name,
            "Schema version created"
        );
        Ok(record)
    }

    /// Versions of one schema in version order. Unknown schemas yield an empty list.
    pub fn list(&self, ctx: &OpContext, schema_id: SchemaId, include_deleted: bool) -> Result<Vec<SchemaRecord>> {
        let mut records = self
            .space
            .execute(ctx, Access::Read, |tx| lookup::versions(tx, schema_id))
            .map_err(|e| e.into_domain("list schema versions"))?;
        if !include_deleted {
            records.retain(|r| !r.is_soft_deleted);
        }
        Ok(records)
    }

    /// Versions across all schemas, ordered by table name then version.
    ///
    /// Only live versions unless `include_inactive`, which returns every
    /// stored version including soft-deleted ones.
    pub fn list_all(&self, ctx: &OpContext, include_inactive: bool) -> Result<Vec<SchemaRecord>> {
        self.space
            .execute(ctx, Access::Read, |tx| lookup::all(tx, include_inactive))
            .map_err(|e| e.into_domain("list schemas"))
    }

    pub fn get(&self, ctx: &OpContext, schema_id: SchemaId, version: &SemVer) -> Result<SchemaRecord> {
        self.space
            .execute(ctx, Access::Read, |tx| lookup::find(tx, schema_id, version))
            .map_err(|e| e.into_domain("get schema version"))?
            .filter(|r| !r.is_soft_deleted)
            .ok_or_else(|| Error::not_found(format!("schema {schema_id} version {version}")))
    }

    pub fn get_active(&self, ctx: &OpContext, schema_id: SchemaId) -> Result<SchemaRecord> {
        self.space
            .execute(ctx, Access::Read, |tx| lookup::active_for_schema(tx, schema_id))
            .map_err(|e| e.into_domain("get active schema"))?
            .ok_or_else(|| Error::not_found(format!("active version of schema {schema_id}")))
    }

    /// The live version governing `table_name`.
    pub fn get_active_by_table(&self, ctx: &OpContext, table_name: &str) -> Result<SchemaRecord> {
        self.space
            .execute(ctx, Access::Read, |tx| lookup::active_for_table(tx, table_name))
            .map_err(|e| e.into_domain("get active schema by table"))?
            .ok_or_else(|| Error::not_found(format!("active schema for table {table_name}")))
    }

    /// Makes `version` the only active version of `schema_id`.
    pub fn activate(&self, ctx: &OpContext, schema_id: SchemaId, version: &SemVer) -> Result<SchemaRecord> {
        let record = self
            .space
            .execute(ctx, Access::Write, |tx| {
                let Some(mut record) =
                    lookup::find(tx, schema_id, version)?.filter(|r| !r.is_soft_deleted)
                else {
                    return Err(Error::not_found(format!("schema {schema_id} version {version}")).into());
                };
                let id = schema_id.to_string();
                let deactivated = tx.execute(
                    "UPDATE entity_schemas SET is_active = 0
                     WHERE schema_id = ?1 AND version <> ?2 AND is_active = 1",
                    params![id, version.to_string()],
                )?;
                ctx.check()?;
                tx.execute(
                    "UPDATE entity_schemas SET is_active = 1 WHERE schema_id = ?1 AND version = ?2",
                    params![id, version.to_string()],
                )?;
                debug!(schema_id = %schema_id, deactivated, "Activation swap applied");
                record.is_active = true;
                Ok(record)
            })
            .map_err(|e| write_error(e, "activate schema"))?;
        info!(
            space = self.space.space_id(),
            schema_id = %schema_id,
            version = %version,
            "Schema version activated"
        );
        Ok(record)
    }

    /// Soft-deletes one version. Deleting the active version leaves the schema
    /// with no active version.
    pub fn delete(&self, ctx: &OpContext, schema_id: SchemaId, version: &SemVer) -> Result<()> {
        self.space
            .execute(ctx, Access::Write, |tx| {
                let changed = tx.execute(
                    "UPDATE entity_schemas SET is_soft_deleted = 1, is_active = 0
                     WHERE schema_id = ?1 AND version = ?2 AND is_soft_deleted = 0",
                    params![schema_id.to_string(), version.to_string()],
                )?;
                if changed == 0 {
                    return Err(Error::not_found(format!("schema {schema_id} version {version}")).into());
                }
                Ok(())
            })
            .map_err(|e| e.into_domain("delete schema version"))?;
        info!(
            space = self.space.space_id(),
            schema_id = %schema_id,
            version = %version,
            "Schema version deleted"
        );
        Ok(())
    }
}

fn insert_version(
    tx: &Connection,
    ctx: &OpContext,
    input: &CreateSchemaInput,
    checked: &Checked,
) -> DbResult<SchemaRecord> {
    let (schema_id, history) = match input.schema_id {
        Some(id) => {
            let history = lookup::versions(tx, id)?;
            if history.is_empty() {
                return Err(Error::not_found(format!("schema {id}")).into());
            }
            (id, history)
        }
        None => match lookup::latest_schema_with_slug(tx, &checked.slug)? {
            Some(id) => (id, lookup::versions(tx, id)?),
            None => (SchemaId::new(), Vec::new()),
        },
    };

    let version = match checked.version {
        Some(version) => version,
        None => SemVer::resolve_next(history.iter().map(|r| &r.version))
            .map_err(|e| Error::invalid("version", e.to_string()))?,
    };
    if history.iter().any(|r| r.version == version) {
        return Err(Error::conflict(format!("schema {schema_id} already has version {version}")).into());
    }

    if let Some(first) = lookup::first_version(&history) {
        let mut errors = FieldErrors::new();
        if first.table_name != input.table_name {
            errors.push(
                "tableName",
                format!("must stay {:?} across versions of this schema", first.table_name),
            );
        }
        if first.slug != checked.slug {
            errors.push(
                "slug",
                format!("must stay {:?} across versions of this schema", first.slug),
            );
        }
        errors.into_result()?;
    }

    if !category_is_live(tx, &input.category_id)? {
        return Err(Error::invalid("categoryId", "unknown or deleted category").into());
    }

    let record = SchemaRecord {
        schema_id,
        version,
        definition: input.definition.clone(),
        table_name: input.table_name.clone(),
        slug: checked.slug.clone(),
        category_id: input.category_id.clone(),
        created_at: now_millis(),
        is_active: true,
        is_soft_deleted: false,
    };

    ctx.check()?;
    let id = schema_id.to_string();
    tx.execute(
        "UPDATE entity_schemas SET is_active = 0 WHERE schema_id = ?1 AND is_active = 1",
        params![id],
    )?;
    tx.execute(
        "INSERT INTO entity_schemas (schema_id, version, version_major, version_minor,
             version_patch, definition, table_name, slug, category_id, created_at,
             is_active, is_soft_deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, 0)",
        params![
            id,
            version.to_string(),
            version.major(),
            version.minor(),
            version.patch(),
            serde_json::to_string(&record.definition)?,
            record.table_name,
            record.slug,
            record.category_id.as_str(),
            record.created_at,
        ],
    )?;
    Ok(record)
}

/// Translates the constraint failures a write can hit; everything else goes
/// through [`DbError::into_domain`].
fn write_error(err: DbError, operation: &str) -> Error {
    match err.constraint() {
        Some(Constraint::PrimaryKey(_)) => {
            Error::conflict("a version with this schema id and version already exists")
        }
        Some(Constraint::Unique(columns)) => {
            match columns.first().map(String::as_str) {
                Some("table_name") => {
                    Error::conflict("table name is held by the active version of another schema")
                }
                Some("slug") => Error::conflict("slug is held by the active version of another schema"),
                Some("schema_id") if columns.len() == 1 => Error::conflict(
                    "another writer activated a version of this schema first, retry",
                ),
                _ => Error::conflict("a version with this schema id and version already exists"),
            }
        }
        Some(Constraint::ForeignKey) => Error::invalid("categoryId", "unknown or deleted category"),
        _ => err.into_domain(operation),
    }
}
