pub mod config;
pub mod error;
pub mod migration;
pub mod provider;
pub mod schema;

pub use config::PivotConfig;
pub use error::{PivotError, Result};
pub use migration::{LedgerEntry, Migration, MigrationState};
pub use provider::{MigrationLedger, ProviderFuture, SchemaProvider};
pub use schema::{Change, ChangeDetail, ChangeKind, ChangeTarget, ColumnDef, SchemaSnapshot};
