//! Schema diffing, migration synthesis and the apply/rollback lifecycle.

mod dialect;
mod diff;
mod generator;
mod orchestrator;
mod script;
mod store;

pub use dialect::{DdlDialect, MySqlDialect, DEFAULT_COLUMN_TYPE};
pub use diff::DiffEngine;
pub use generator::MigrationGenerator;
pub use orchestrator::{ApplyReport, MigrationOrchestrator, MigrationStatus, MigrationStatusEntry};
pub use script::{checksum, split_sql_statements, MigrationScript};
pub use store::{MigrationFile, MigrationFileStore};
pub(crate) use store::write_new_file;
