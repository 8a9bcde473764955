use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use tessera_db::categories::upsert_category;
use tessera_db::{Access, SpaceExecutor};
use tessera_engine::{
    CategoryId, ConfigError, CreateSchemaInput, Engine, EngineConfig, EngineError, ListOptions,
    OpContext, init_tracing,
};

fn ctx() -> OpContext {
    OpContext::background()
}

fn seed_category(engine: &Engine) {
    engine
        .space()
        .execute(&ctx(), Access::Write, |tx| {
            upsert_category(tx, &CategoryId::from("inventory"), "Inventory")
        })
        .unwrap();
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.database_path, ":memory:");
    assert_eq!(config.space_id, "default");
    assert_eq!(config.busy_timeout_ms, 5_000);
    assert_eq!(config.default_page_size, 20);
    assert_eq!(config.max_page_size, 100);
    assert_eq!(config.log_filter, "info");
    assert!(config.is_in_memory());
    assert_eq!(config.space_options().busy_timeout, Duration::from_secs(5));
}

#[test]
fn partial_toml_keeps_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
        space_id = "acme"
        max_page_size = 50
        "#,
    )
    .unwrap();
    assert_eq!(config.space_id, "acme");
    assert_eq!(config.max_page_size, 50);
    assert_eq!(config.default_page_size, 20);
    assert_eq!(config.database_path, ":memory:");
}

#[test]
fn empty_toml_is_default() {
    assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
}

#[test]
fn rejects_malformed_toml() {
    let err = EngineConfig::from_toml_str("max_page_size = \"lots\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn rejects_inconsistent_page_sizes() {
    let err = EngineConfig::from_toml_str("default_page_size = 200").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    let err = EngineConfig::from_toml_str("max_page_size = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    let err = EngineConfig::from_toml_str("space_id = \"  \"").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn load_reports_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = EngineConfig::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

// ── Engine ──────────────────────────────────────────────────────

#[test]
fn open_in_memory_engine() {
    let engine = Engine::open(&EngineConfig::default()).unwrap();
    seed_category(&engine);
    engine
        .registry()
        .create(
            &ctx(),
            CreateSchemaInput::new(json!({"type": "object"}), "notes", "notes", "inventory"),
        )
        .unwrap();
    let note = engine
        .store()
        .create(&ctx(), "notes", json!({"text": "hi"}), None)
        .unwrap();
    assert_eq!(engine.store().get(&ctx(), "notes", note.entity_id).unwrap(), note);
}

#[test]
fn file_backed_engine_persists_across_opens() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("engine.toml");
    let db = temp.path().join("tenant.db");
    std::fs::write(
        &path,
        format!(
            "database_path = {:?}\nspace_id = \"acme\"\ndefault_page_size = 2\nmax_page_size = 3\n",
            db.display().to_string()
        ),
    )
    .unwrap();

    {
        let engine = Engine::open_from_file(&path).unwrap();
        assert_eq!(engine.config().space_id, "acme");
        seed_category(&engine);
        engine
            .registry()
            .create(
                &ctx(),
                CreateSchemaInput::new(json!({"type": "object"}), "notes", "notes", "inventory"),
            )
            .unwrap();
        for i in 0..4 {
            engine
                .store()
                .create(&ctx(), "notes", json!({"n": i}), None)
                .unwrap();
        }
    }

    let engine = Engine::open_from_file(&path).unwrap();
    let page = engine.store().list(&ctx(), "notes", &ListOptions::new()).unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.page_size, 2);
    assert_eq!(page.records.len(), 2);

    let page = engine
        .store()
        .list(&ctx(), "notes", &ListOptions::new().page_size(10))
        .unwrap();
    assert_eq!(page.page_size, 3);
}

#[test]
fn open_rejects_invalid_config() {
    let config = EngineConfig {
        default_page_size: 0,
        ..EngineConfig::default()
    };
    assert!(matches!(
        Engine::open(&config),
        Err(EngineError::Config(ConfigError::Invalid(_)))
    ));
}

#[test]
fn open_reports_unusable_path() {
    let temp = TempDir::new().unwrap();
    let config = EngineConfig {
        database_path: temp.path().join("missing-dir").join("tenant.db").display().to_string(),
        ..EngineConfig::default()
    };
    assert!(matches!(Engine::open(&config), Err(EngineError::Space(_))));
}

#[test]
fn init_tracing_is_idempotent() {
    init_tracing("debug");
    assert!(!init_tracing("debug"));
}
