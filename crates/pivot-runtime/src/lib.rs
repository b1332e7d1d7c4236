//! Runtime for pivot: database providers, snapshot storage and migrations.

pub mod db;
pub mod migrations;
pub mod snapshots;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use db::{create_provider, MySqlProvider};
pub use migrations::{
    ApplyReport, DiffEngine, MigrationGenerator, MigrationOrchestrator, MigrationStatus,
};
pub use snapshots::SnapshotStore;
