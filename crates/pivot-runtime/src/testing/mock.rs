//! In-memory schema provider for testing.

use chrono::{DateTime, Utc};

use pivot_core::error::{PivotError, Result};
use pivot_core::migration::LedgerEntry;
use pivot_core::provider::{MigrationLedger, ProviderFuture, SchemaProvider};
use pivot_core::schema::SchemaSnapshot;

use crate::migrations::split_sql_statements;

/// Mock provider that records executed statements and keeps its ledger in memory.
///
/// # Example
///
/// ```ignore
/// let mut provider = MockSchemaProvider::new();
/// provider.fail_on("DROP TABLE");
///
/// let mut orchestrator = MigrationOrchestrator::new(provider, store);
/// orchestrator.apply_all().await?;
/// assert_eq!(orchestrator.provider().executed().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSchemaProvider {
    schema: SchemaSnapshot,
    connected: bool,
    refuse_connection: bool,
    executed: Vec<String>,
    fail_patterns: Vec<String>,
    ledger: Vec<LedgerEntry>,
    ledger_initialized: bool,
    fail_ledger_reads: bool,
}

impl MockSchemaProvider {
    /// Create a mock with an empty schema and an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema returned by `get_schema`.
    pub fn with_schema(mut self, schema: SchemaSnapshot) -> Self {
        self.schema = schema;
        self
    }

    /// Replace the schema returned by `get_schema`.
    pub fn set_schema(&mut self, schema: SchemaSnapshot) {
        self.schema = schema;
    }

    /// Make `connect` fail.
    pub fn refuse_connection(mut self) -> Self {
        self.refuse_connection = true;
        self
    }

    /// Fail any statement containing `pattern`.
    pub fn fail_on(&mut self, pattern: impl Into<String>) {
        self.fail_patterns.push(pattern.into());
    }

    /// Make ledger lookups fail with a non-"no rows" error.
    pub fn fail_ledger_reads(&mut self, fail: bool) {
        self.fail_ledger_reads = fail;
    }

    /// Statements executed successfully, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Ledger entries ordered by version.
    pub fn ledger(&self) -> Vec<LedgerEntry> {
        let mut entries = self.ledger.clone();
        entries.sort_by(|a, b| a.version.cmp(&b.version));
        entries
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn ledger_initialized(&self) -> bool {
        self.ledger_initialized
    }

    /// Insert a ledger entry directly, bypassing `record`.
    pub fn insert_ledger_entry(&mut self, entry: LedgerEntry) {
        self.ledger.retain(|e| e.version != entry.version);
        self.ledger.push(entry);
    }

    /// Overwrite the applied timestamp of a ledger entry.
    pub fn set_applied_at(&mut self, version: &str, applied_at: DateTime<Utc>) {
        if let Some(entry) = self.ledger.iter_mut().find(|e| e.version == version) {
            entry.applied_at = applied_at;
        }
    }

    fn execute(&mut self, script: &str) -> Result<()> {
        for statement in split_sql_statements(script) {
            if let Some(pattern) = self
                .fail_patterns
                .iter()
                .find(|p| statement.contains(p.as_str()))
            {
                return Err(PivotError::Execution(format!(
                    "statement matched failure pattern '{}': {}",
                    pattern, statement
                )));
            }
            self.executed.push(statement);
        }
        Ok(())
    }

    fn check_ledger_read(&self) -> Result<()> {
        if self.fail_ledger_reads {
            return Err(PivotError::Ledger("simulated ledger read failure".into()));
        }
        Ok(())
    }
}

impl SchemaProvider for MockSchemaProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&mut self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            if self.refuse_connection {
                return Err(PivotError::Connection("connection refused".into()));
            }
            self.connected = true;
            Ok(())
        })
    }

    fn get_schema(&mut self) -> ProviderFuture<'_, SchemaSnapshot> {
        Box::pin(async move { Ok(self.schema.clone()) })
    }

    fn apply_migration<'a>(&'a mut self, script: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move { self.execute(script) })
    }
}

impl MigrationLedger for MockSchemaProvider {
    fn init_ledger(&mut self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            self.ledger_initialized = true;
            Ok(())
        })
    }

    fn is_applied<'a>(&'a mut self, version: &'a str) -> ProviderFuture<'a, bool> {
        Box::pin(async move {
            self.check_ledger_read()?;
            Ok(self.ledger.iter().any(|e| e.version == version))
        })
    }

    fn last_applied(&mut self) -> ProviderFuture<'_, Option<LedgerEntry>> {
        Box::pin(async move {
            self.check_ledger_read()?;
            Ok(self
                .ledger
                .iter()
                .max_by(|a, b| {
                    a.applied_at
                        .cmp(&b.applied_at)
                        .then_with(|| a.version.cmp(&b.version))
                })
                .cloned())
        })
    }

    fn applied_migrations(&mut self) -> ProviderFuture<'_, Vec<LedgerEntry>> {
        Box::pin(async move {
            self.check_ledger_read()?;
            Ok(self.ledger())
        })
    }

    fn record<'a>(&'a mut self, entry: &'a LedgerEntry) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            if self.ledger.iter().any(|e| e.version == entry.version) {
                return Err(PivotError::Ledger(format!(
                    "duplicate entry for version {}",
                    entry.version
                )));
            }
            self.ledger.push(entry.clone());
            Ok(())
        })
    }

    fn remove<'a>(&'a mut self, version: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.ledger.retain(|e| e.version != version);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_statements_until_failure() {
        let mut provider = MockSchemaProvider::new();
        provider.fail_on("DROP");

        let err = provider
            .apply_migration("CREATE TABLE a (id INT);\nDROP TABLE b;\nCREATE TABLE c (id INT);")
            .await
            .unwrap_err();

        assert!(matches!(err, PivotError::Execution(_)));
        assert_eq!(provider.executed(), ["CREATE TABLE a (id INT)"]);
    }

    #[tokio::test]
    async fn test_record_rejects_duplicate_version() {
        let mut provider = MockSchemaProvider::new();
        let entry = LedgerEntry::new("20240101000000000", "abc");

        provider.record(&entry).await.unwrap();
        assert!(matches!(
            provider.record(&entry).await,
            Err(PivotError::Ledger(_))
        ));
        assert!(provider.is_applied("20240101000000000").await.unwrap());
        assert_eq!(provider.last_applied().await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn test_empty_ledger_is_not_an_error() {
        let mut provider = MockSchemaProvider::new();
        assert!(!provider.is_applied("20240101000000000").await.unwrap());
        assert!(provider.last_applied().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let mut provider = MockSchemaProvider::new().refuse_connection();
        assert!(matches!(
            provider.connect().await,
            Err(PivotError::Connection(_))
        ));
        assert!(!provider.is_connected());
    }
}
