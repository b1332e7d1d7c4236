use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use pivot_core::error::{PivotError, Result};
use pivot_core::migration::Migration;

use super::script::MigrationScript;

const MIGRATION_SUFFIX: &str = "_migration.sql";

/// A migration file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: String,
    pub path: PathBuf,
}

impl MigrationFile {
    /// Read the raw file content.
    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| PivotError::MalformedMigration {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Read and split the file into sections.
    pub fn load(&self) -> Result<(String, MigrationScript)> {
        let content = self.read()?;
        let script = MigrationScript::parse(&content, &self.path)?;
        Ok((content, script))
    }
}

/// Directory of `<version>_migration.sql` files.
///
/// Files are written once and never modified.
#[derive(Debug, Clone)]
pub struct MigrationFileStore {
    dir: PathBuf,
}

impl MigrationFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a version is stored at.
    pub fn path_for(&self, version: &str) -> PathBuf {
        self.dir.join(Migration::file_name(version))
    }

    /// List migration files in ascending version order.
    ///
    /// A missing directory yields an empty list. Files not named
    /// `<version>_migration.sql` are ignored.
    pub fn list(&self) -> Result<Vec<MigrationFile>> {
        if !self.dir.exists() {
            debug!("Migrations directory does not exist: {:?}", self.dir);
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let version = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|name| name.strip_suffix(MIGRATION_SUFFIX))
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            if let Some(version) = version {
                files.push(MigrationFile { version, path });
            }
        }

        files.sort_by(|a, b| a.version.cmp(&b.version));

        debug!("Found {} migration files in {:?}", files.len(), self.dir);
        Ok(files)
    }

    /// Locate the file for a version.
    pub fn find(&self, version: &str) -> Result<MigrationFile> {
        let path = self.path_for(version);
        if !path.is_file() {
            return Err(PivotError::MigrationNotFound(version.to_string()));
        }
        Ok(MigrationFile {
            version: version.to_string(),
            path,
        })
    }

    /// Create the file for a version. An existing file is a
    /// [`PivotError::VersionCollision`] and is left untouched.
    pub fn create(&self, version: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PivotError::Write {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        let path = self.path_for(version);
        write_new_file(&path, content).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => PivotError::VersionCollision(version.to_string()),
            _ => PivotError::Write {
                path: path.clone(),
                reason: e.to_string(),
            },
        })?;

        Ok(path)
    }
}

/// Write `content` to `path`, which must not exist yet.
///
/// The content is staged in a temporary file next to `path` and linked into
/// place only after it is synced, so a failed write leaves nothing under the
/// final name. An existing `path` fails with `ErrorKind::AlreadyExists`.
pub(crate) fn write_new_file(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(content.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}
