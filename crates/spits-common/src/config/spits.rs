//! Coordinator configuration.
//!
//! Configuration is plain serde data, loaded from TOML files:
//!
//! ```toml
//! statement_logging = true
//!
//! [backend]
//! type = "sqlite"
//! path = "/var/lib/spits/main.db"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::{SpitsError, SpitsResult};

/// Statement-text dialect used when rendering queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectName {
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

/// Which backend a coordinator drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process memory engine. Each backend built from this config gets
    /// its own private database.
    Memory,
    /// SQLite database file.
    Sqlite {
        /// Database file path. `:memory:` opens a private in-memory database.
        path: PathBuf,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Memory
    }
}

impl BackendConfig {
    /// Returns the backend's native dialect.
    pub fn native_dialect(&self) -> DialectName {
        match self {
            // The memory engine speaks MySQL in its logs.
            BackendConfig::Memory => DialectName::MySql,
            BackendConfig::Sqlite { .. } => DialectName::Sqlite,
        }
    }
}

/// Top-level SPITS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpitsConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Rendering dialect for logs. Defaults to the backend's native dialect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<DialectName>,

    /// Log every backend statement at debug level.
    #[serde(default)]
    pub statement_logging: bool,

    /// Roll back pending staged changes when a coordinator is dropped.
    #[serde(default = "default_rollback_on_drop")]
    pub rollback_on_drop: bool,
}

fn default_rollback_on_drop() -> bool {
    true
}

impl Default for SpitsConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            dialect: None,
            statement_logging: false,
            rollback_on_drop: default_rollback_on_drop(),
        }
    }
}

impl SpitsConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for a SQLite database file.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Sqlite { path: path.into() },
            ..Self::default()
        }
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serializes configuration to TOML text.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the dialect statements are rendered in.
    pub fn effective_dialect(&self) -> DialectName {
        self.dialect.unwrap_or_else(|| self.backend.native_dialect())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SpitsResult<()> {
        if let BackendConfig::Sqlite { path } = &self.backend {
            if path.as_os_str().is_empty() {
                return Err(SpitsError::invalid_config("sqlite path is empty"));
            }
        }
        Ok(())
    }
}
