use std::path::PathBuf;

use thiserror::Error;

/// Core error type for schema capture, diffing and migration.
#[derive(Error, Debug)]
pub enum PivotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid schema for table {table}: {reason}")]
    InvalidSchema { table: String, reason: String },

    #[error("Failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Unsupported change kind: {0}")]
    UnsupportedChangeKind(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Nothing to roll back")]
    NothingToRollback,

    #[error("Migration {0} is irreversible and cannot be rolled back")]
    Irreversible(String),

    #[error("Migration version {0} already exists")]
    VersionCollision(String),

    #[error("Migration file not found for version {0}")]
    MigrationNotFound(String),

    #[error("Malformed migration file {}: {reason}", .path.display())]
    MalformedMigration { path: PathBuf, reason: String },

    #[error("Migration {version} failed: {source}")]
    MigrationFailed {
        version: String,
        #[source]
        source: Box<PivotError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PivotError {
    /// Attach the migration version that was being processed.
    pub fn for_version(self, version: impl Into<String>) -> Self {
        PivotError::MigrationFailed {
            version: version.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for PivotError {
    fn from(e: serde_json::Error) -> Self {
        PivotError::Serialization(e.to_string())
    }
}

/// Result type alias using PivotError.
pub type Result<T> = std::result::Result<T, PivotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_offending_identifier() {
        let err = PivotError::Write {
            path: PathBuf::from("/tmp/migrations/20240101000000000_migration.sql"),
            reason: "permission denied".into(),
        };
        assert!(err.to_string().contains("20240101000000000_migration.sql"));

        let err = PivotError::InvalidSchema {
            table: "users".into(),
            reason: "missing columns map".into(),
        };
        assert!(err.to_string().contains("users"));
    }

    #[test]
    fn test_for_version_wraps_source() {
        let err = PivotError::Execution("syntax error".into()).for_version("20240101000000000");
        let message = err.to_string();
        assert!(message.contains("20240101000000000"));
        assert!(message.contains("syntax error"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
