mod database;
mod logging;

pub use database::{DatabaseConfig, Dbms};
pub use logging::LoggingConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PivotError, Result};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = ".schema_manager/pivot.toml";

/// Root configuration, passed explicitly to every command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotConfig {
    /// Target database.
    pub database: DatabaseConfig,

    /// Snapshot and migration directories.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PivotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PivotError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Loaded configuration from {}", path.display());
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| PivotError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Configuration with default paths for the given connection.
    pub fn with_connection(dbms: Dbms, url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                dbms,
                url: url.into(),
            },
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| PivotError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PivotError::Write {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        std::fs::write(path, content).map_err(|e| PivotError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of timestamped snapshot files.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Directory of timestamped migration files.
    #[serde(default = "default_migration_dir")]
    pub migration_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            migration_dir: default_migration_dir(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".schema_manager/snapshots")
}

fn default_migration_dir() -> PathBuf {
    PathBuf::from(".schema_manager/migrations")
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
        return content.to_string();
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
