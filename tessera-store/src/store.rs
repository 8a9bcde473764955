//! The entity store service.

use crate::options::{EntityPage, ListOptions, PageLimits};
use crate::record::{COLUMNS, EntityRecord, from_row};
use crate::validators::ValidatorCache;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::sync::Arc;
use tessera_db::{Access, Constraint, DbError, DbResult, OpContext, SpaceExecutor, SqliteSpace};
use tessera_registry::{SchemaRecord, lookup};
use tessera_schema::{ValidatedPayload, to_field_errors};
use tessera_types::{EntityId, Error, Result, now_millis};
use tracing::{debug, info};

/// Entity CRUD over one tenant space, validated against the active schema
/// of each table.
pub struct EntityStore<E: SpaceExecutor = SqliteSpace> {
    space: Arc<E>,
    limits: PageLimits,
    validators: Arc<ValidatorCache>,
}

impl<E: SpaceExecutor> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            space: Arc::clone(&self.space),
            limits: self.limits,
            validators: Arc::clone(&self.validators),
        }
    }
}

impl<E: SpaceExecutor> EntityStore<E> {
    pub fn new(space: Arc<E>) -> Self {
        Self::with_limits(space, PageLimits::default())
    }

    pub fn with_limits(space: Arc<E>, limits: PageLimits) -> Self {
        Self {
            space,
            limits,
            validators: Arc::default(),
        }
    }

    pub fn limits(&self) -> &PageLimits {
        &self.limits
    }

    /// One page of a table's entities plus the total across pages.
    ///
    /// Defaults to the newest entities first. Soft-deleted entities are
    /// skipped unless `options.include_deleted` is set.
    pub fn list(&self, ctx: &OpContext, table_name: &str, options: &ListOptions) -> Result<EntityPage> {
        self.space
            .execute(ctx, Access::Read, |tx| {
                let schema = governing_schema(tx, table_name)?;
                let validator = self.validators.get(&schema)?;
                let list = options.resolve(&self.limits, validator.compiled().property_names())?;

                let filter = if list.include_deleted { "" } else { " AND is_deleted = 0" };
                let total: i64 = tx.query_row(
                    &format!("SELECT COUNT(*) FROM entities WHERE table_name = ?1{filter}"),
                    params![table_name],
                    |row| row.get(0),
                )?;

                let order = list.order.sql();
                let sql = format!(
                    "SELECT {COLUMNS} FROM entities WHERE table_name = ?1{filter}
                     ORDER BY {} {order}, entity_id {order} LIMIT ?2 OFFSET ?3",
                    list.key.expression(4)
                );
                let mut stmt = tx.prepare(&sql)?;
                let rows = match list.key.json_path() {
                    Some(path) => stmt.query_map(
                        params![table_name, list.page_size, list.offset(), path],
                        from_row,
                    )?,
                    None => stmt.query_map(
                        params![table_name, list.page_size, list.offset()],
                        from_row,
                    )?,
                };
                let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                debug!(
                    table = table_name,
                    total,
                    page = list.page,
                    returned = records.len(),
                    "Listed entities"
                );
                Ok(EntityPage {
                    records,
                    total: u64::try_from(total).unwrap_or_default(),
                    page: list.page,
                    page_size: list.page_size,
                })
            })
            .map_err(|e| e.into_domain("list entities"))
    }

    /// Validates `payload` against the table's active schema and stores it
    /// under a new id, stamped with that schema version.
    pub fn create(
        &self,
        ctx: &OpContext,
        table_name: &str,
        payload: Value,
        created_by: Option<&str>,
    ) -> Result<EntityRecord> {
        let record = self
            .space
            .execute(ctx, Access::Write, |tx| {
                let schema = governing_schema(tx, table_name)?;
                let validated = self.validate(&schema, payload)?;
                ctx.check()?;
                insert_entity(tx, EntityId::new(), table_name, validated, created_by)
            })
            .map_err(|e| match e.constraint() {
                Some(Constraint::PrimaryKey(_)) => Error::conflict("entity id already in use, retry"),
                _ => e.into_domain("create entity"),
            })?;
        info!(
            table = table_name,
            entity_id = %record.entity_id,
            version = %record.entity_schema_version,
            "Entity created"
        );
        Ok(record)
    }

    /// A live entity of `table_name`.
    pub fn get(&self, ctx: &OpContext, table_name: &str, entity_id: EntityId) -> Result<EntityRecord> {
        self.fetch(ctx, table_name, entity_id)?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| entity_not_found(table_name, entity_id))
    }

    /// Like [`EntityStore::get`] but also returns soft-deleted entities.
    pub fn get_including_deleted(
        &self,
        ctx: &OpContext,
        table_name: &str,
        entity_id: EntityId,
    ) -> Result<EntityRecord> {
        self.fetch(ctx, table_name, entity_id)?
            .ok_or_else(|| entity_not_found(table_name, entity_id))
    }

    /// Replaces the payload of a live entity.
    ///
    /// The payload is validated against the schema active now, which need not
    /// be the version the entity was created under, and the entity is
    /// re-stamped with it.
    pub fn update(
        &self,
        ctx: &OpContext,
        table_name: &str,
        entity_id: EntityId,
        payload: Value,
        updated_by: Option<&str>,
    ) -> Result<EntityRecord> {
        let record = self
            .space
            .execute(ctx, Access::Write, |tx| {
                let schema = governing_schema(tx, table_name)?;
                let validated = self.validate(&schema, payload)?;
                ctx.check()?;
                let changed = tx.execute(
                    "UPDATE entities
                     SET payload = ?1, entity_schema_id = ?2, entity_schema_version = ?3,
                         updated_at = ?4, updated_by = ?5
                     WHERE entity_id = ?6 AND table_name = ?7 AND is_deleted = 0",
                    params![
                        serde_json::to_string(validated.value())?,
                        validated.schema_id().to_string(),
                        validated.schema_version().to_string(),
                        now_millis(),
                        updated_by,
                        entity_id.to_string(),
                        table_name,
                    ],
                )?;
                if changed == 0 {
                    return Err(entity_not_found(table_name, entity_id).into());
                }
                select_entity(tx, table_name, entity_id)?
                    .ok_or_else(|| DbError::InvalidData(format!("entity {entity_id} vanished after update")))
            })
            .map_err(|e| e.into_domain("update entity"))?;
        info!(
            table = table_name,
            entity_id = %entity_id,
            version = %record.entity_schema_version,
            "Entity updated"
        );
        Ok(record)
    }

    /// Soft-deletes a live entity.
    pub fn delete(&self, ctx: &OpContext, table_name: &str, entity_id: EntityId) -> Result<()> {
        self.space
            .execute(ctx, Access::Write, |tx| {
                governing_schema(tx, table_name)?;
                let changed = tx.execute(
                    "UPDATE entities SET is_deleted = 1, deleted_at = ?1
                     WHERE entity_id = ?2 AND table_name = ?3 AND is_deleted = 0",
                    params![now_millis(), entity_id.to_string(), table_name],
                )?;
                if changed == 0 {
                    return Err(entity_not_found(table_name, entity_id).into());
                }
                Ok(())
            })
            .map_err(|e| e.into_domain("delete entity"))?;
        info!(table = table_name, entity_id = %entity_id, "Entity deleted");
        Ok(())
    }

    fn fetch(&self, ctx: &OpContext, table_name: &str, entity_id: EntityId) -> Result<Option<EntityRecord>> {
        self.space
            .execute(ctx, Access::Read, |tx| {
                governing_schema(tx, table_name)?;
                select_entity(tx, table_name, entity_id)
            })
            .map_err(|e| e.into_domain("get entity"))
    }

    fn validate(&self, schema: &SchemaRecord, payload: Value) -> DbResult<ValidatedPayload> {
        let validator = self.validators.get(schema)?;
        validator
            .validate(payload)
            .map_err(|issues| Error::Validation(to_field_errors(&issues)).into())
    }
}

/// The active schema for `table_name`, `NotFound` when the table has none.
fn governing_schema(conn: &Connection, table_name: &str) -> DbResult<SchemaRecord> {
    lookup::active_for_table(conn, table_name)?
        .ok_or_else(|| Error::not_found(format!("active schema for table {table_name}")).into())
}

fn insert_entity(
    conn: &Connection,
    entity_id: EntityId,
    table_name: &str,
    validated: ValidatedPayload,
    created_by: Option<&str>,
) -> DbResult<EntityRecord> {
    let now = now_millis();
    let record = EntityRecord {
        entity_id,
        table_name: table_name.to_string(),
        entity_schema_id: validated.schema_id(),
        entity_schema_version: validated.schema_version(),
        payload: validated.into_value(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        is_deleted: false,
        created_by: created_by.map(str::to_string),
        updated_by: None,
    };
    conn.execute(
        "INSERT INTO entities (entity_id, table_name, payload, entity_schema_id,
             entity_schema_version, created_at, updated_at, is_deleted, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        params![
            record.entity_id.to_string(),
            record.table_name,
            serde_json::to_string(&record.payload)?,
            record.entity_schema_id.to_string(),
            record.entity_schema_version.to_string(),
            record.created_at,
            record.updated_at,
            record.created_by,
        ],
    )?;
    Ok(record)
}

fn select_entity(conn: &Connection, table_name: &str, entity_id: EntityId) -> DbResult<Option<EntityRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM entities WHERE entity_id = ?1 AND table_name = ?2");
    Ok(conn
        .query_row(&sql, params![entity_id.to_string(), table_name], from_row)
        .optional()?)
}

fn entity_not_found(table_name: &str, entity_id: EntityId) -> Error {
    Error::not_found(format!("entity {entity_id} in table {table_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_db::categories::upsert_category;
    use tessera_registry::{CreateSchemaInput, SchemaRegistry};
    use tessera_types::CategoryId;

    #[test]
    fn validator_cache_holds_only_the_active_version() {
        let space = Arc::new(SqliteSpace::open_in_memory("t1").unwrap());
        let ctx = OpContext::background();
        space
            .execute(&ctx, Access::Write, |tx| upsert_category(tx, &CategoryId::from("c"), "C"))
            .unwrap();
        let registry = SchemaRegistry::new(Arc::clone(&space));
        let first = registry
            .create(&ctx, CreateSchemaInput::new(json!({"type": "object"}), "notes", "notes", "c"))
            .unwrap();
        let store = EntityStore::new(space);

        for _ in 0..3 {
            store.create(&ctx, "notes", json!({}), None).unwrap();
        }
        store.list(&ctx, "notes", &ListOptions::new()).unwrap();
        assert_eq!(store.validators.cached_versions(), vec![(first.schema_id, first.version)]);

        let second = registry
            .create(&ctx, CreateSchemaInput::new(json!({"type": "object"}), "notes", "notes", "c"))
            .unwrap();
        store.create(&ctx, "notes", json!({}), None).unwrap();
        assert_eq!(store.validators.cached_versions(), vec![(second.schema_id, second.version)]);

        let other = registry
            .create(&ctx, CreateSchemaInput::new(json!({"type": "object"}), "tasks", "tasks", "c"))
            .unwrap();
        store.create(&ctx, "tasks", json!({}), None).unwrap();
        let mut expected = vec![(second.schema_id, second.version), (other.schema_id, other.version)];
        expected.sort();
        assert_eq!(store.validators.cached_versions(), expected);

        registry.activate(&ctx, first.schema_id, &first.version).unwrap();
        store.create(&ctx, "notes", json!({}), None).unwrap();
        let mut expected = vec![(first.schema_id, first.version), (other.schema_id, other.version)];
        expected.sort();
        assert_eq!(store.validators.cached_versions(), expected);
    }
}
