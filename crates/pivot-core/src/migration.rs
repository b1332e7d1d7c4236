use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// First line of the forward section of a migration file.
pub const UP_MARKER: &str = "-- Up migration";

/// First line of the reverse section of a migration file.
pub const DOWN_MARKER: &str = "-- Down migration";

/// Prefix of the line written into the down section for each destructive change.
pub const IRREVERSIBLE_MARKER: &str = "-- Irreversible:";

/// An immutable, versioned pair of forward/backward scripts.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Sortable, time-derived identifier.
    pub version: String,
    /// Forward section, including its marker line.
    pub up_script: String,
    /// Reverse section, including its marker line.
    pub down_script: String,
    /// SHA-256 of the full file content.
    pub checksum: String,
    /// False when any change could not be reversed.
    pub reversible: bool,
    /// Where the migration was written.
    pub path: PathBuf,
}

impl Migration {
    /// File name for a version.
    pub fn file_name(version: &str) -> String {
        format!("{}_migration.sql", version)
    }

    /// Full file content: up section, blank line, down section.
    pub fn content(&self) -> String {
        format!("{}\n{}", self.up_script, self.down_script)
    }
}

/// A row in the ledger table recording an applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: String,
    pub applied_at: DateTime<Utc>,
    pub description: String,
    pub checksum: String,
}

impl LedgerEntry {
    pub fn new(version: impl Into<String>, checksum: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            description: format!("Migration {} applied", version),
            version,
            applied_at: Utc::now(),
            checksum: checksum.into(),
        }
    }
}

/// Lifecycle state of a migration file.
///
/// A rolled-back migration has no ledger entry and reads as `Pending` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Applied,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Applied => write!(f, "applied"),
        }
    }
}
