use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::PivotConfig;
use pivot_core::provider::{MigrationLedger, SchemaProvider};
use pivot_runtime::migrations::MigrationFileStore;
use pivot_runtime::{MigrationOrchestrator, MigrationStatus};

use super::{connect, print_header};

/// Show applied and pending migrations.
#[derive(Parser)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, config: &PivotConfig) -> Result<()> {
        let provider = connect(config).await?;
        self.run(provider, config).await?;
        Ok(())
    }

    async fn run<P>(&self, provider: P, config: &PivotConfig) -> Result<MigrationStatus>
    where
        P: SchemaProvider + MigrationLedger,
    {
        print_header("Migration Status");

        let store = MigrationFileStore::new(&config.paths.migration_dir);
        let mut orchestrator = MigrationOrchestrator::new(provider, store);
        let status = orchestrator.status().await?;

        if status.entries.is_empty() {
            println!("  {} No migrations found", style("ℹ").blue());
            println!();
            return Ok(status);
        }

        let applied: Vec<_> = status.applied().collect();
        let pending: Vec<_> = status.pending().collect();

        if !applied.is_empty() {
            println!("  {} Applied:", style("✓").green());
            for m in &applied {
                let down_marker = if m.reversible {
                    style("↓").green().to_string()
                } else {
                    style("-").dim().to_string()
                };
                let mut notes = Vec::new();
                if m.checksum_mismatch {
                    notes.push(style("modified since applied").yellow().to_string());
                }
                if !m.file_present {
                    notes.push(style("file missing").red().to_string());
                }
                let applied_at = m
                    .applied_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "    {} {} {} ({}) {}",
                    down_marker,
                    style(&m.version).cyan(),
                    style("at").dim(),
                    applied_at,
                    notes.join(", ")
                );
            }
        }

        if !pending.is_empty() {
            if !applied.is_empty() {
                println!();
            }
            println!("  {} Pending:", style("○").yellow());
            for m in &pending {
                println!("    {} {}", style("→").dim(), style(&m.version).yellow());
            }
        }

        println!();
        println!(
            "  {} {} applied, {} pending",
            style("ℹ").blue(),
            applied.len(),
            pending.len()
        );
        println!();
        println!(
            "  {} = has down migration, {} = irreversible",
            style("↓").green(),
            style("-").dim()
        );
        println!();
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::config_in;
    use pivot_core::migration::LedgerEntry;
    use pivot_core::schema::{Change, ColumnDef};
    use pivot_runtime::testing::MockSchemaProvider;
    use pivot_runtime::MigrationGenerator;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_lists_applied_and_pending() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mut generator = MigrationGenerator::new(&config.paths.migration_dir);
        let first = generator
            .generate(&[Change::add_table(
                "users",
                vec![ColumnDef::new("id", "INT", false)],
            )])
            .unwrap();
        let second = generator
            .generate(&[Change::remove_column("users", "nickname")])
            .unwrap();

        let mut provider = MockSchemaProvider::new();
        provider.insert_ledger_entry(LedgerEntry::new(&first.version, &first.checksum));

        let status = StatusCommand {}.run(provider, &config).await.unwrap();
        let applied: Vec<_> = status.applied().map(|e| e.version.clone()).collect();
        let pending: Vec<_> = status.pending().map(|e| e.version.clone()).collect();
        assert_eq!(applied, vec![first.version]);
        assert_eq!(pending, vec![second.version]);
    }

    #[tokio::test]
    async fn test_status_without_migrations() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let status = StatusCommand {}
            .run(MockSchemaProvider::new(), &config)
            .await
            .unwrap();
        assert!(status.entries.is_empty());
    }
}
