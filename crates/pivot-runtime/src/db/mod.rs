//! Database providers.

mod mysql;

pub use mysql::{MySqlProvider, LEDGER_TABLE};

use pivot_core::config::{DatabaseConfig, Dbms};

/// Build the provider for the configured DBMS.
///
/// The returned provider is not connected yet.
pub fn create_provider(config: &DatabaseConfig) -> MySqlProvider {
    match config.dbms {
        Dbms::MySql => MySqlProvider::new(&config.url),
    }
}
