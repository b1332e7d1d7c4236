use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use console::style;

use pivot_core::config::PivotConfig;
use pivot_core::provider::SchemaProvider;
use pivot_runtime::SnapshotStore;

use super::{connect, print_header};

/// Capture the live schema into the snapshot directory.
#[derive(Parser)]
pub struct SnapshotCommand {}

impl SnapshotCommand {
    pub async fn execute(self, config: &PivotConfig) -> Result<()> {
        let mut provider = connect(config).await?;
        self.run(&mut provider, config).await
    }

    async fn run<P: SchemaProvider>(&self, provider: &mut P, config: &PivotConfig) -> Result<()> {
        print_header("Snapshot");
        let path = capture_snapshot(provider, &config.paths.snapshot_dir).await?;
        println!(
            "  {} Schema snapshot saved to {}",
            style("✓").green(),
            path.display()
        );
        println!();
        Ok(())
    }
}

/// Read the live schema and store it as a new snapshot.
pub(crate) async fn capture_snapshot<P: SchemaProvider>(
    provider: &mut P,
    dir: &Path,
) -> Result<PathBuf> {
    let schema = provider.get_schema().await?;
    let path = SnapshotStore::new(dir).save(&schema)?;
    Ok(path)
}
