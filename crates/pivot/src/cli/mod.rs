mod apply;
mod diff;
mod init;
mod migrate;
mod rollback;
mod snapshot;
mod status;

pub use apply::ApplyCommand;
pub use diff::DiffCommand;
pub use init::InitCommand;
pub use migrate::MigrateCommand;
pub use rollback::RollbackCommand;
pub use snapshot::SnapshotCommand;
pub use status::StatusCommand;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use pivot_core::config::{LoggingConfig, PivotConfig, DEFAULT_CONFIG_PATH};
use pivot_core::provider::SchemaProvider;
use pivot_runtime::{create_provider, MySqlProvider};

/// pivot - snapshot-based schema migrations
#[derive(Parser)]
#[command(name = "pivot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Write the configuration and create the migration ledger.
    Init(InitCommand),

    /// Capture the live schema into the snapshot directory.
    Snapshot(SnapshotCommand),

    /// Show changes between the latest snapshot and the live schema.
    Diff(DiffCommand),

    /// Generate a migration file from the detected changes.
    Migrate(MigrateCommand),

    /// Apply pending migrations.
    Apply(ApplyCommand),

    /// Roll back the most recently applied migration.
    Rollback(RollbackCommand),

    /// Show applied and pending migrations.
    Status(StatusCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();

        let Cli {
            command,
            config,
            verbose,
        } = self;
        let load = || load_config(&config, verbose);

        match command {
            Commands::Init(cmd) => cmd.execute(&config, verbose).await,
            Commands::Snapshot(cmd) => cmd.execute(&load()?).await,
            Commands::Diff(cmd) => cmd.execute(&load()?).await,
            Commands::Migrate(cmd) => cmd.execute(&load()?).await,
            Commands::Apply(cmd) => cmd.execute(&load()?).await,
            Commands::Rollback(cmd) => cmd.execute(&load()?).await,
            Commands::Status(cmd) => cmd.execute(&load()?).await,
        }
    }
}

fn load_config(path: &Path, verbose: bool) -> Result<PivotConfig> {
    if !path.exists() {
        anyhow::bail!(
            "Configuration file not found: {}\nRun `pivot init` to create one.",
            path.display()
        );
    }

    let config = PivotConfig::from_file(path)?;
    init_logging(&config.logging, verbose);
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`, which wins
/// over the configured level.
pub(crate) fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A second install in the same process is a no-op.
    let _ = if logging.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Open the configured provider.
pub(crate) async fn connect(config: &PivotConfig) -> Result<MySqlProvider> {
    let mut provider = create_provider(&config.database);
    provider.connect().await?;
    Ok(provider)
}

pub(crate) fn print_header(title: &str) {
    println!();
    println!("  {} {}", style("pivot").bold().cyan(), style(title).bold());
    println!();
}

#[cfg(test)]
pub(crate) mod test_support {
    use pivot_core::config::{Dbms, PivotConfig};
    use tempfile::TempDir;

    /// Config whose directories live inside `dir`.
    pub fn config_in(dir: &TempDir) -> PivotConfig {
        let mut config = PivotConfig::with_connection(Dbms::MySql, "mysql://root@localhost/test");
        config.paths.snapshot_dir = dir.path().join("snapshots");
        config.paths.migration_dir = dir.path().join("migrations");
        config
    }
}
