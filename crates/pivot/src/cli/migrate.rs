use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::PivotConfig;
use pivot_core::migration::Migration;
use pivot_core::provider::SchemaProvider;
use pivot_runtime::MigrationGenerator;

use super::diff::{detect_changes, print_changes};
use super::{connect, print_header};

/// Generate a migration file from the detected changes.
#[derive(Parser)]
pub struct MigrateCommand {}

impl MigrateCommand {
    pub async fn execute(self, config: &PivotConfig) -> Result<()> {
        let mut provider = connect(config).await?;
        self.run(&mut provider, config).await?;
        Ok(())
    }

    async fn run<P: SchemaProvider>(
        &self,
        provider: &mut P,
        config: &PivotConfig,
    ) -> Result<Option<Migration>> {
        print_header("Migrate");

        let changes = detect_changes(provider, config).await?;
        if changes.is_empty() {
            println!("  {} No migrations needed", style("ℹ").blue());
            println!();
            return Ok(None);
        }

        print_changes(&changes);
        println!();

        let migration = MigrationGenerator::new(&config.paths.migration_dir).generate(&changes)?;

        println!(
            "  {} Migration script generated: {}",
            style("✓").green(),
            style(migration.path.display()).cyan()
        );
        if !migration.reversible {
            println!(
                "  {} Contains destructive changes and cannot be rolled back",
                style("⚠").yellow()
            );
        }
        println!();
        Ok(Some(migration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::config_in;
    use pivot_core::schema::{ColumnSchema, SchemaSnapshot, TableSchema};
    use pivot_runtime::testing::MockSchemaProvider;
    use pivot_runtime::SnapshotStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_migrate_writes_file_for_changes() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mut provider = MockSchemaProvider::new().with_schema(SchemaSnapshot::new().with_table(
            "users",
            TableSchema::new().with_column("id", ColumnSchema::new("int", false)),
        ));

        let migration = MigrateCommand {}
            .run(&mut provider, &config)
            .await
            .unwrap()
            .unwrap();

        assert!(migration.reversible);
        assert!(migration.path.starts_with(&config.paths.migration_dir));
        assert!(migration.up_script.contains("CREATE TABLE users"));
    }

    #[tokio::test]
    async fn test_migrate_without_changes_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        SnapshotStore::new(&config.paths.snapshot_dir)
            .save(&SchemaSnapshot::new())
            .unwrap();
        let mut provider = MockSchemaProvider::new();

        let migration = MigrateCommand {}.run(&mut provider, &config).await.unwrap();
        assert!(migration.is_none());
        assert!(!config.paths.migration_dir.exists());
    }
}
