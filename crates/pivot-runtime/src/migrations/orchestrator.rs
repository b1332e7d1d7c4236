//! Applies pending migration files and rolls back the most recent one.
//!
//! The ledger inside the target database is the source of truth for what has
//! been applied. Execution is strictly sequential with no locking: two
//! orchestrators racing against one database can double-apply.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use pivot_core::error::{PivotError, Result};
use pivot_core::migration::{LedgerEntry, MigrationState};
use pivot_core::provider::{MigrationLedger, SchemaProvider};

use super::script::checksum;
use super::store::MigrationFileStore;

/// Outcome of [`MigrationOrchestrator::apply_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Versions applied during this run, in order.
    pub applied: Vec<String>,
    /// Versions skipped because the ledger already had them.
    pub skipped: Vec<String>,
}

/// Status of one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatusEntry {
    pub version: String,
    pub state: MigrationState,
    /// When the ledger recorded it, for applied migrations.
    pub applied_at: Option<DateTime<Utc>>,
    /// Whether the file is present on disk.
    pub file_present: bool,
    /// Whether the down section can be executed.
    pub reversible: bool,
    /// Stored ledger checksum differs from the current file content.
    pub checksum_mismatch: bool,
}

/// Status of every known migration, ordered by version.
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    pub entries: Vec<MigrationStatusEntry>,
}

impl MigrationStatus {
    pub fn applied(&self) -> impl Iterator<Item = &MigrationStatusEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == MigrationState::Applied)
    }

    pub fn pending(&self) -> impl Iterator<Item = &MigrationStatusEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == MigrationState::Pending)
    }
}

/// Sequences migration files against a provider's ledger.
pub struct MigrationOrchestrator<P> {
    provider: P,
    store: MigrationFileStore,
}

impl<P> MigrationOrchestrator<P>
where
    P: SchemaProvider + MigrationLedger,
{
    /// The provider must already be connected.
    pub fn new(provider: P, store: MigrationFileStore) -> Self {
        Self { provider, store }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Create the ledger table if it does not exist.
    pub async fn init(&mut self) -> Result<()> {
        self.provider.init_ledger().await
    }

    /// Whether a version has a ledger entry.
    pub async fn is_applied(&mut self, version: &str) -> Result<bool> {
        self.provider.is_applied(version).await
    }

    /// Apply every pending migration in ascending version order.
    ///
    /// Already-applied versions are skipped. The first failure aborts the
    /// rest of the batch; migrations applied earlier in the run stay applied.
    pub async fn apply_all(&mut self) -> Result<ApplyReport> {
        let files = self.store.list()?;
        let mut report = ApplyReport::default();

        for file in files {
            if self.provider.is_applied(&file.version).await? {
                info!("Migration {} already applied, skipping", file.version);
                report.skipped.push(file.version);
                continue;
            }

            let (content, script) = file.load()?;
            info!("Applying migration: {}", file.version);

            self.provider
                .apply_migration(&script.up)
                .await
                .map_err(|e| e.for_version(&file.version))?;

            let entry = LedgerEntry::new(&file.version, checksum(&content));
            self.provider
                .record(&entry)
                .await
                .map_err(|e| e.for_version(&file.version))?;

            info!("Migration {} applied successfully", file.version);
            report.applied.push(file.version);
        }

        debug!(
            "Apply finished: {} applied, {} skipped",
            report.applied.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Roll back the most recently applied migration and return its version.
    ///
    /// Fails with [`PivotError::NothingToRollback`] on an empty ledger and with
    /// [`PivotError::Irreversible`] when the file has no executable down
    /// section. If the down-script fails the ledger entry is kept.
    pub async fn rollback(&mut self) -> Result<String> {
        let last = self
            .provider
            .last_applied()
            .await?
            .ok_or(PivotError::NothingToRollback)?;
        let version = last.version;

        let (_, script) = self.store.find(&version)?.load()?;
        if !script.is_reversible() {
            for what in &script.irreversible {
                warn!("Migration {} is irreversible: {}", version, what);
            }
            return Err(PivotError::Irreversible(version));
        }

        info!("Rolling back migration: {}", version);
        self.provider
            .apply_migration(&script.down)
            .await
            .map_err(|e| e.for_version(&version))?;

        self.provider
            .remove(&version)
            .await
            .map_err(|e| e.for_version(&version))?;

        info!("Migration {} rolled back successfully", version);
        Ok(version)
    }

    /// Applied/pending state of every file, plus ledger entries whose file is gone.
    ///
    /// Checksums are compared for reporting only.
    pub async fn status(&mut self) -> Result<MigrationStatus> {
        let files = self.store.list()?;
        let mut ledger = self.provider.applied_migrations().await?;
        let mut entries = Vec::with_capacity(files.len());

        for file in files {
            let (content, script) = file.load()?;
            let recorded = ledger
                .iter()
                .position(|e| e.version == file.version)
                .map(|idx| ledger.remove(idx));

            let (state, applied_at, checksum_mismatch) = match recorded {
                Some(entry) => {
                    let mismatch = entry.checksum != checksum(&content);
                    if mismatch {
                        warn!("Migration {} changed since it was applied", file.version);
                    }
                    (MigrationState::Applied, Some(entry.applied_at), mismatch)
                }
                None => (MigrationState::Pending, None, false),
            };

            entries.push(MigrationStatusEntry {
                version: file.version,
                state,
                applied_at,
                file_present: true,
                reversible: script.is_reversible(),
                checksum_mismatch,
            });
        }

        for orphan in ledger {
            warn!("Migration {} is in the ledger but has no file", orphan.version);
            entries.push(MigrationStatusEntry {
                version: orphan.version,
                state: MigrationState::Applied,
                applied_at: Some(orphan.applied_at),
                file_present: false,
                reversible: false,
                checksum_mismatch: false,
            });
        }

        entries.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(MigrationStatus { entries })
    }
}
