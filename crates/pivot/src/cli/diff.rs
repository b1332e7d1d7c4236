use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::PivotConfig;
use pivot_core::provider::SchemaProvider;
use pivot_core::schema::{Change, ChangeKind};
use pivot_runtime::{DiffEngine, SnapshotStore};

use super::{connect, print_header};

/// Show changes between the latest snapshot and the live schema.
#[derive(Parser)]
pub struct DiffCommand {}

impl DiffCommand {
    pub async fn execute(self, config: &PivotConfig) -> Result<()> {
        let mut provider = connect(config).await?;
        self.run(&mut provider, config).await
    }

    async fn run<P: SchemaProvider>(&self, provider: &mut P, config: &PivotConfig) -> Result<()> {
        print_header("Diff");

        let changes = detect_changes(provider, config).await?;
        if changes.is_empty() {
            println!("  {} No changes detected", style("ℹ").blue());
            println!();
            return Ok(());
        }

        println!("  {} Detected changes:", style("→").dim());
        print_changes(&changes);
        println!();
        Ok(())
    }
}

/// Diff the latest stored snapshot against the live schema.
pub(crate) async fn detect_changes<P: SchemaProvider>(
    provider: &mut P,
    config: &PivotConfig,
) -> Result<Vec<Change>> {
    let previous = SnapshotStore::new(&config.paths.snapshot_dir).latest()?;
    let current = provider.get_schema().await?;
    Ok(DiffEngine::new().compare(&previous, &current))
}

pub(crate) fn print_changes(changes: &[Change]) {
    for change in changes {
        let marker = match change.kind {
            ChangeKind::Add => style("+").green(),
            ChangeKind::Remove => style("-").red(),
            ChangeKind::Modify => style("~").yellow(),
        };
        println!("    {} {} {}", marker, style(&change.target).cyan(), change.detail);
    }
}
