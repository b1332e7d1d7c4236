//! Capabilities the migration engine needs from a live database.
//!
//! A provider owns a single connection for the lifetime of a run. All
//! calls are sequential; none of these traits promise cross-process safety.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::migration::LedgerEntry;
use crate::schema::SchemaSnapshot;

/// Boxed future returned by provider methods.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Reads a live catalog and executes statements against it.
pub trait SchemaProvider: Send {
    /// Short dialect name, e.g. `mysql`.
    fn name(&self) -> &str;

    /// Open the connection. Fails with `PivotError::Connection`.
    fn connect(&mut self) -> ProviderFuture<'_, ()>;

    /// Capture the current schema. Fails with `PivotError::Schema`.
    fn get_schema(&mut self) -> ProviderFuture<'_, SchemaSnapshot>;

    /// Execute an arbitrary script. Fails with `PivotError::Execution`.
    fn apply_migration<'a>(&'a mut self, script: &'a str) -> ProviderFuture<'a, ()>;
}

/// Persisted record of applied migrations, stored inside the target database.
///
/// "No rows" is never an error: lookups return `false`, `None` or an empty
/// list. Any other failure is `PivotError::Ledger`.
pub trait MigrationLedger: Send {
    /// Create the ledger table if it does not exist.
    fn init_ledger(&mut self) -> ProviderFuture<'_, ()>;

    /// Exact lookup by version.
    fn is_applied<'a>(&'a mut self, version: &'a str) -> ProviderFuture<'a, bool>;

    /// Entry with the greatest `applied_at`, ties broken by version.
    fn last_applied(&mut self) -> ProviderFuture<'_, Option<LedgerEntry>>;

    /// All entries ordered by version.
    fn applied_migrations(&mut self) -> ProviderFuture<'_, Vec<LedgerEntry>>;

    /// Insert an entry. At most one entry may exist per version.
    fn record<'a>(&'a mut self, entry: &'a LedgerEntry) -> ProviderFuture<'a, ()>;

    /// Delete the entry for a version.
    fn remove<'a>(&'a mut self, version: &'a str) -> ProviderFuture<'a, ()>;
}
