use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::PivotConfig;
use pivot_core::error::PivotError;
use pivot_core::provider::{MigrationLedger, SchemaProvider};
use pivot_runtime::migrations::MigrationFileStore;
use pivot_runtime::MigrationOrchestrator;

use super::snapshot::capture_snapshot;
use super::{connect, print_header};

/// Roll back the most recently applied migration, then snapshot the schema.
#[derive(Parser)]
pub struct RollbackCommand {}

impl RollbackCommand {
    pub async fn execute(self, config: &PivotConfig) -> Result<()> {
        let provider = connect(config).await?;
        self.run(provider, config).await?;
        Ok(())
    }

    async fn run<P>(&self, provider: P, config: &PivotConfig) -> Result<Option<String>>
    where
        P: SchemaProvider + MigrationLedger,
    {
        print_header("Rollback");

        let store = MigrationFileStore::new(&config.paths.migration_dir);
        let mut orchestrator = MigrationOrchestrator::new(provider, store);

        let version = match orchestrator.rollback().await {
            Ok(version) => version,
            Err(PivotError::NothingToRollback) => {
                println!("  {} No migrations to roll back", style("ℹ").blue());
                println!();
                return Ok(None);
            }
            Err(PivotError::Irreversible(version)) => {
                anyhow::bail!(
                    "Migration {} is irreversible; restore from a backup or write a new migration instead",
                    version
                );
            }
            Err(e) => return Err(e.into()),
        };

        let path = capture_snapshot(orchestrator.provider_mut(), &config.paths.snapshot_dir).await?;

        println!("  {} Rolled back: {}", style("✓").green(), style(&version).cyan());
        println!(
            "  {} Post-rollback snapshot: {}",
            style("ℹ").blue(),
            path.display()
        );
        println!();
        Ok(Some(version))
    }
}
