//! Testing utilities.
//!
//! The orchestrator and CLI flows can be exercised without a live database
//! by driving them with [`MockSchemaProvider`]. Tests that need a real MySQL
//! server read `TEST_DATABASE_URL` explicitly and are skipped when it is unset.

mod mock;

pub use mock::MockSchemaProvider;

/// Environment variable naming the MySQL database used by live tests.
pub const TEST_DATABASE_URL_VAR: &str = "TEST_DATABASE_URL";

/// URL of the live test database, if one was configured.
pub fn test_database_url() -> Option<String> {
    std::env::var(TEST_DATABASE_URL_VAR)
        .ok()
        .filter(|url| !url.is_empty())
}
