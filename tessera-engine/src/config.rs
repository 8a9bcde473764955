//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessera_db::SpaceOptions;
use tessera_store::PageLimits;
use thiserror::Error;
use tracing::info;

/// `database_path` value that selects a private in-memory space.
pub const IN_MEMORY: &str = ":memory:";

/// Errors loading or checking an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one engine instance. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite file of the tenant space, or [`IN_MEMORY`].
    pub database_path: String,
    /// Tenant space identifier, used in logs.
    pub space_id: String,
    /// How long a writer waits on another writer (ms).
    pub busy_timeout_ms: u64,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            space_id: "default".to_string(),
            busy_timeout_ms: 5_000,
            default_page_size: 20,
            max_page_size: 100,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses and checks a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and checks a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), space_id = %config.space_id, "Loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.space_id.trim().is_empty() {
            return Err(ConfigError::Invalid("space_id must not be empty".into()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".into()));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    #[must_use]
    pub fn space_options(&self) -> SpaceOptions {
        SpaceOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    #[must_use]
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}
