use rusqlite::params;
use std::time::Duration;
use tempfile::TempDir;
use tessera_db::categories::{category_is_live, soft_delete_category, upsert_category};
use tessera_db::{
    Access, CURRENT_VERSION, CancelToken, Constraint, DbError, OpContext, SpaceExecutor,
    SpaceOptions, SqliteSpace, applied_version,
};
use tessera_types::CategoryId;

fn ctx() -> OpContext {
    OpContext::background()
}

fn count_categories(space: &SqliteSpace) -> i64 {
    space
        .execute(&ctx(), Access::Read, |tx| {
            Ok(tx.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?)
        })
        .unwrap()
}

// ── Opening ─────────────────────────────────────────────────────

#[test]
fn in_memory_space_is_migrated() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    assert_eq!(space.space_id(), "t1");
    let version = space
        .execute(&ctx(), Access::Read, |tx| applied_version(tx))
        .unwrap();
    assert_eq!(version, CURRENT_VERSION);
}

#[test]
fn reopening_a_file_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tenant.db");
    {
        let space = SqliteSpace::open("t1", &path, &SpaceOptions::default()).unwrap();
        space
            .execute(&ctx(), Access::Write, |tx| {
                upsert_category(tx, &CategoryId::from("tools"), "Tools")
            })
            .unwrap();
    }
    let space = SqliteSpace::open("t1", &path, &SpaceOptions::default()).unwrap();
    assert_eq!(count_categories(&space), 1);
}

// ── Transactions ────────────────────────────────────────────────

#[test]
fn failed_work_rolls_back() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let result: Result<(), DbError> = space.execute(&ctx(), Access::Write, |tx| {
        upsert_category(tx, &CategoryId::from("tools"), "Tools")?;
        Err(DbError::InvalidData("boom".into()))
    });
    assert!(result.is_err());
    assert_eq!(count_categories(&space), 0);
}

#[test]
fn cancelled_context_never_begins() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let token = CancelToken::new();
    token.cancel();
    let mut ran = false;
    let result = space.execute(&ctx().with_cancel(token), Access::Write, |_| {
        ran = true;
        Ok(())
    });
    assert!(matches!(result, Err(DbError::Cancelled)));
    assert!(!ran);
}

#[test]
fn cancellation_mid_write_rolls_back() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let token = CancelToken::new();
    let op = ctx().with_cancel(token.clone());
    let result = space.execute(&op, Access::Write, |tx| {
        upsert_category(tx, &CategoryId::from("tools"), "Tools")?;
        token.cancel();
        Ok(())
    });
    assert!(matches!(result, Err(DbError::Cancelled)));
    assert_eq!(count_categories(&space), 0);
}

#[test]
fn expired_deadline_is_cancelled() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let op = ctx().with_timeout(Duration::ZERO);
    assert!(op.is_done());
    let result = space.execute(&op, Access::Read, |_| Ok(()));
    assert!(matches!(result, Err(DbError::Cancelled)));
}

#[test]
fn cancelled_error_maps_to_domain_cancelled() {
    assert_eq!(
        DbError::Cancelled.into_domain("create"),
        tessera_types::Error::Cancelled
    );
    let domain = tessera_types::Error::not_found("x");
    assert_eq!(DbError::Domain(domain.clone()).into_domain("get"), domain);
}

// ── Constraint classification ───────────────────────────────────

#[test]
fn classifies_primary_key_violation() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let err = space
        .execute(&ctx(), Access::Write, |tx| {
            tx.execute("INSERT INTO categories (id, name) VALUES ('a', 'A')", [])?;
            tx.execute("INSERT INTO categories (id, name) VALUES ('a', 'B')", [])?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.constraint(), Some(Constraint::PrimaryKey(vec!["id".into()])));
}

#[test]
fn classifies_foreign_key_violation() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let err = space
        .execute(&ctx(), Access::Write, |tx| {
            tx.execute(
                "INSERT INTO entity_schemas (schema_id, version, version_major, version_minor,
                     version_patch, definition, table_name, slug, category_id, created_at, is_active)
                 VALUES ('s', '1.0.0', 1, 0, 0, '{}', 'cards', 'cards', 'missing', 0, 1)",
                [],
            )?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.constraint(), Some(Constraint::ForeignKey));
}

#[test]
fn partial_unique_index_allows_one_active_version() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let insert = "INSERT INTO entity_schemas (schema_id, version, version_major, version_minor,
                      version_patch, definition, table_name, slug, category_id, created_at, is_active)
                  VALUES (?1, ?2, 1, 0, ?3, '{}', ?4, ?4, 'c', 0, ?5)";
    space
        .execute(&ctx(), Access::Write, |tx| {
            upsert_category(tx, &CategoryId::from("c"), "C")?;
            tx.execute(insert, params!["s", "1.0.0", 0, "cards", 1])?;
            tx.execute(insert, params!["s", "1.0.1", 1, "cards", 0])?;
            Ok(())
        })
        .unwrap();
    let err = space
        .execute(&ctx(), Access::Write, |tx| {
            tx.execute(insert, params!["s", "1.0.2", 2, "decks", 1])?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.constraint(), Some(Constraint::Unique(vec!["schema_id".into()])));

    let err = space
        .execute(&ctx(), Access::Write, |tx| {
            tx.execute(insert, params!["other", "1.0.0", 0, "cards", 1])?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err.constraint(), Some(Constraint::Unique(_))));
}

#[test]
fn second_writer_gets_busy_after_timeout() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tenant.db");
    let a = SqliteSpace::open("t1", &path, &SpaceOptions::default()).unwrap();
    let b = SqliteSpace::open(
        "t1",
        &path,
        &SpaceOptions {
            busy_timeout: Duration::from_millis(50),
        },
    )
    .unwrap();

    let b_result = a
        .execute(&ctx(), Access::Write, |tx| {
            upsert_category(tx, &CategoryId::from("held"), "Held")?;
            let outcome = std::thread::scope(|s| {
                s.spawn(|| {
                    b.execute(&ctx(), Access::Write, |tx| {
                        upsert_category(tx, &CategoryId::from("other"), "Other")
                    })
                })
                .join()
                .unwrap()
            });
            Ok(outcome)
        })
        .unwrap();

    let err = b_result.unwrap_err();
    assert_eq!(err.constraint(), Some(Constraint::Busy));
    assert!(err.into_domain("upsert").is_conflict());
}

// ── Categories ──────────────────────────────────────────────────

#[test]
fn category_lifecycle() {
    let space = SqliteSpace::open_in_memory("t1").unwrap();
    let id = CategoryId::from("tools");
    space
        .execute(&ctx(), Access::Write, |tx| {
            assert!(!category_is_live(tx, &id)?);
            upsert_category(tx, &id, "Tools")?;
            assert!(category_is_live(tx, &id)?);
            assert!(soft_delete_category(tx, &id)?);
            assert!(!soft_delete_category(tx, &id)?);
            assert!(!category_is_live(tx, &id)?);
            upsert_category(tx, &id, "Tools again")?;
            assert!(category_is_live(tx, &id)?);
            Ok(())
        })
        .unwrap();
}
