use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::{Dbms, PivotConfig};
use pivot_core::provider::MigrationLedger;

use super::{connect, init_logging, print_header};

/// Write the configuration and create the migration ledger.
#[derive(Parser)]
pub struct InitCommand {
    /// Database connection URL.
    #[arg(short, long)]
    pub connection: String,

    /// Database management system.
    #[arg(short, long, default_value = "mysql")]
    pub dbms: Dbms,

    /// Directory for schema snapshots.
    #[arg(short, long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Directory for migration files.
    #[arg(short, long)]
    pub migration_dir: Option<PathBuf>,
}

impl InitCommand {
    pub async fn execute(self, config_path: &Path, verbose: bool) -> Result<()> {
        let config = self.write_config(config_path)?;
        init_logging(&config.logging, verbose);

        print_header("Init");
        println!(
            "  {} Configuration written to {}",
            style("✓").green(),
            config_path.display()
        );

        let mut provider = connect(&config).await?;
        provider.init_ledger().await?;

        println!("  {} Migration ledger ready", style("✓").green());
        println!();
        println!("  Next: run {} to capture the current schema.", style("pivot snapshot").cyan());
        println!();
        Ok(())
    }

    /// Create the working directories and persist the configuration.
    fn write_config(&self, config_path: &Path) -> Result<PivotConfig> {
        let mut config = PivotConfig::with_connection(self.dbms, &self.connection);
        if let Some(dir) = &self.snapshot_dir {
            config.paths.snapshot_dir = dir.clone();
        }
        if let Some(dir) = &self.migration_dir {
            config.paths.migration_dir = dir.clone();
        }

        std::fs::create_dir_all(&config.paths.snapshot_dir)?;
        std::fs::create_dir_all(&config.paths.migration_dir)?;
        config.write_to(config_path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_parse_init() {
        let cli = Cli::try_parse_from([
            "pivot",
            "init",
            "--connection",
            "mysql://root@localhost/app",
            "--migration-dir",
            "db/migrations",
        ])
        .unwrap();

        let Commands::Init(cmd) = cli.command else {
            panic!("expected init");
        };
        assert_eq!(cmd.connection, "mysql://root@localhost/app");
        assert_eq!(cmd.dbms, Dbms::MySql);
        assert_eq!(cmd.migration_dir, Some(PathBuf::from("db/migrations")));
        assert!(cmd.snapshot_dir.is_none());
    }

    #[test]
    fn test_parse_init_requires_connection() {
        assert!(Cli::try_parse_from(["pivot", "init"]).is_err());
    }

    #[test]
    fn test_parse_init_rejects_unknown_dbms() {
        assert!(Cli::try_parse_from(["pivot", "init", "-c", "x", "--dbms", "oracle"]).is_err());
    }

    #[test]
    fn test_write_config_creates_dirs_and_file() {
        let dir = TempDir::new().unwrap();
        let cmd = InitCommand {
            connection: "mysql://root@localhost/app".into(),
            dbms: Dbms::MySql,
            snapshot_dir: Some(dir.path().join("snaps")),
            migration_dir: Some(dir.path().join("migs")),
        };
        let config_path = dir.path().join(".schema_manager/pivot.toml");

        cmd.write_config(&config_path).unwrap();

        assert!(dir.path().join("snaps").is_dir());
        assert!(dir.path().join("migs").is_dir());
        let loaded = PivotConfig::from_file(&config_path).unwrap();
        assert_eq!(loaded.database.url, "mysql://root@localhost/app");
        assert_eq!(loaded.paths.migration_dir, dir.path().join("migs"));
    }
}
