use crate::config::{ConfigError, EngineConfig};
use std::path::Path;
use std::sync::Arc;
use tessera_db::{DbError, SqliteSpace};
use tessera_registry::SchemaRegistry;
use tessera_store::EntityStore;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open tenant space: {0}")]
    Space(#[from] DbError),
}

/// A registry and an entity store over one opened tenant space.
pub struct Engine {
    config: EngineConfig,
    space: Arc<SqliteSpace>,
    registry: SchemaRegistry,
    store: EntityStore,
}

impl Engine {
    /// Opens the configured space, applying pending migrations.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let space = if config.is_in_memory() {
            SqliteSpace::open_in_memory(config.space_id.clone())?
        } else {
            SqliteSpace::open(
                config.space_id.clone(),
                Path::new(&config.database_path),
                &config.space_options(),
            )?
        };
        let space = Arc::new(space);
        info!(
            space_id = %config.space_id,
            in_memory = config.is_in_memory(),
            "Engine ready"
        );
        Ok(Self {
            config: config.clone(),
            registry: SchemaRegistry::new(Arc::clone(&space)),
            store: EntityStore::with_limits(Arc::clone(&space), config.page_limits()),
            space,
        })
    }

    /// Loads the config at `path` and opens the engine it describes.
    pub fn open_from_file(path: &Path) -> Result<Self, EngineError> {
        let config = EngineConfig::load(path)?;
        Self::open(&config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn space(&self) -> &Arc<SqliteSpace> {
        &self.space
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }
}
