//! Directory of timestamped schema snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use pivot_core::error::{PivotError, Result};
use pivot_core::schema::SchemaSnapshot;

use crate::migrations::write_new_file;

const SNAPSHOT_PREFIX: &str = "snapshot_";
const SNAPSHOT_SUFFIX: &str = ".json";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Stores snapshots as `snapshot_<timestamp>.json`.
///
/// Files are never overwritten, and the lexically greatest name is the most
/// recent capture.
pub struct SnapshotStore {
    dir: PathBuf,
    last_saved: Option<DateTime<Utc>>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_saved: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `snapshot` under a fresh timestamped name.
    pub fn save(&mut self, snapshot: &SchemaSnapshot) -> Result<PathBuf> {
        let json = snapshot.to_json()?;
        let timestamp = self.next_timestamp();
        let path = self
            .dir
            .join(format!("{}{}{}", SNAPSHOT_PREFIX, timestamp, SNAPSHOT_SUFFIX));

        std::fs::create_dir_all(&self.dir).map_err(|e| PivotError::Write {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        write_new_file(&path, &json).map_err(|e| PivotError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        info!(
            "Snapshot with {} tables saved to {}",
            snapshot.len(),
            path.display()
        );
        Ok(path)
    }

    /// Path of the most recent snapshot, if any.
    pub fn latest_path(&self) -> Result<Option<PathBuf>> {
        if !self.dir.exists() {
            return Ok(None);
        }

        let mut latest: Option<String> = None;
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if !name.starts_with(SNAPSHOT_PREFIX) || !name.ends_with(SNAPSHOT_SUFFIX) {
                continue;
            }
            if latest.as_ref().map_or(true, |current| name > *current) {
                latest = Some(name);
            }
        }

        Ok(latest.map(|name| self.dir.join(name)))
    }

    /// Most recent snapshot, or an empty one when none was taken yet.
    pub fn latest(&self) -> Result<SchemaSnapshot> {
        match self.latest_path()? {
            Some(path) => {
                debug!("Loading snapshot {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                SchemaSnapshot::from_json(&content)
            }
            None => {
                debug!("No snapshot in {}, starting empty", self.dir.display());
                Ok(SchemaSnapshot::new())
            }
        }
    }

    fn next_timestamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_saved {
            if now <= last {
                now = last + Duration::milliseconds(1);
            }
        }
        self.last_saved = Some(now);
        now.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivot_core::schema::{ColumnSchema, TableSchema};
    use tempfile::TempDir;

    fn users() -> SchemaSnapshot {
        SchemaSnapshot::new().with_table(
            "users",
            TableSchema::new()
                .with_column("id", ColumnSchema::new("INT", false))
                .with_column("name", ColumnSchema::new("VARCHAR(255)", true)),
        )
    }

    #[test]
    fn test_latest_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots"));
        assert!(store.latest().unwrap().is_empty());
        assert!(store.latest_path().unwrap().is_none());
    }

    #[test]
    fn test_save_then_latest() {
        let dir = TempDir::new().unwrap();
        let mut store = SnapshotStore::new(dir.path().join("snapshots"));

        let path = store.save(&users()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("snapshot_"));
        assert!(name.ends_with(".json"));

        let loaded = store.latest().unwrap();
        assert_eq!(loaded, users());
        let columns: Vec<_> = loaded.table("users").unwrap().columns.keys().collect();
        assert_eq!(columns, ["id", "name"]);
    }

    #[test]
    fn test_saves_never_overwrite() {
        let dir = TempDir::new().unwrap();
        let mut store = SnapshotStore::new(dir.path());

        let first = store.save(&SchemaSnapshot::new()).unwrap();
        let second = store.save(&users()).unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(store.latest_path().unwrap(), Some(second));
        assert_eq!(store.latest().unwrap(), users());
    }

    #[test]
    fn test_save_refuses_existing_name() {
        let dir = TempDir::new().unwrap();
        let mut store = SnapshotStore::new(dir.path());

        // Pin the next timestamp onto a file that already exists.
        let target = Utc::now() + Duration::days(1);
        let existing = dir.path().join(format!(
            "snapshot_{}.json",
            target.format(TIMESTAMP_FORMAT)
        ));
        std::fs::write(&existing, "{}").unwrap();
        store.last_saved = Some(target - Duration::milliseconds(1));

        let err = store.save(&users()).unwrap_err();
        assert!(matches!(err, PivotError::Write { ref path, .. } if *path == existing));
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "{}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_latest_ignores_unrelated_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.json"), "not a snapshot").unwrap();
        std::fs::write(
            dir.path().join("snapshot_20240101000000000.json"),
            r#"{"a": {"columns": {}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("snapshot_20230101000000000.json"),
            r#"{"b": {"columns": {}}}"#,
        )
        .unwrap();

        let store = SnapshotStore::new(dir.path());
        let latest = store.latest().unwrap();
        assert!(latest.contains_table("a"));
        assert!(!latest.contains_table("b"));
    }

    #[test]
    fn test_invalid_latest_snapshot_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("snapshot_20240101000000000.json"),
            r#"{"users": {"columns": 3}}"#,
        )
        .unwrap();

        let store = SnapshotStore::new(dir.path());
        assert!(matches!(
            store.latest(),
            Err(PivotError::InvalidSchema { .. })
        ));
    }
}
