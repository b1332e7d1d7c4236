use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::PivotConfig;
use pivot_core::provider::{MigrationLedger, SchemaProvider};
use pivot_runtime::migrations::MigrationFileStore;
use pivot_runtime::{ApplyReport, MigrationOrchestrator};

use super::snapshot::capture_snapshot;
use super::{connect, print_header};

/// Apply pending migrations, then snapshot the resulting schema.
#[derive(Parser)]
pub struct ApplyCommand {}

impl ApplyCommand {
    pub async fn execute(self, config: &PivotConfig) -> Result<()> {
        let provider = connect(config).await?;
        self.run(provider, config).await?;
        Ok(())
    }

    async fn run<P>(&self, provider: P, config: &PivotConfig) -> Result<ApplyReport>
    where
        P: SchemaProvider + MigrationLedger,
    {
        print_header("Apply");

        let store = MigrationFileStore::new(&config.paths.migration_dir);
        let mut orchestrator = MigrationOrchestrator::new(provider, store);
        orchestrator.init().await?;

        println!("  {} Running pending migrations...", style("→").dim());
        let report = orchestrator.apply_all().await?;

        for version in &report.skipped {
            println!("    {} {} already applied", style("-").dim(), version);
        }
        for version in &report.applied {
            println!("    {} {}", style("✓").green(), style(version).cyan());
        }

        let path = capture_snapshot(orchestrator.provider_mut(), &config.paths.snapshot_dir).await?;

        println!();
        println!(
            "  {} {} applied, {} skipped",
            style("✓").green(),
            report.applied.len(),
            report.skipped.len()
        );
        println!(
            "  {} Post-migration snapshot: {}",
            style("ℹ").blue(),
            path.display()
        );
        println!();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::config_in;
    use pivot_core::schema::{Change, ColumnDef};
    use pivot_runtime::testing::MockSchemaProvider;
    use pivot_runtime::{MigrationGenerator, SnapshotStore};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_apply_records_and_snapshots() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let migration = MigrationGenerator::new(&config.paths.migration_dir)
            .generate(&[Change::add_table(
                "users",
                vec![ColumnDef::new("id", "INT", false)],
            )])
            .unwrap();

        let report = ApplyCommand {}
            .run(MockSchemaProvider::new(), &config)
            .await
            .unwrap();

        assert_eq!(report.applied, vec![migration.version]);
        assert!(SnapshotStore::new(&config.paths.snapshot_dir)
            .latest_path()
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_apply_failure_skips_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        MigrationGenerator::new(&config.paths.migration_dir)
            .generate(&[Change::add_table(
                "users",
                vec![ColumnDef::new("id", "INT", false)],
            )])
            .unwrap();

        let mut provider = MockSchemaProvider::new();
        provider.fail_on("CREATE TABLE users");

        assert!(ApplyCommand {}.run(provider, &config).await.is_err());
        assert!(!config.paths.snapshot_dir.exists());
    }
}
