use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use pivot_core::error::{PivotError, Result};
use pivot_core::migration::{Migration, DOWN_MARKER, IRREVERSIBLE_MARKER, UP_MARKER};
use pivot_core::schema::{Change, ChangeDetail, ChangeKind, ChangeTarget};

use super::dialect::{DdlDialect, MySqlDialect};
use super::script::checksum;
use super::store::MigrationFileStore;

/// Version format: UTC, millisecond precision, lexically sortable.
const VERSION_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Turns a change list into an immutable migration file.
pub struct MigrationGenerator {
    store: MigrationFileStore,
    dialect: Box<dyn DdlDialect>,
    last_version: Option<DateTime<Utc>>,
}

impl MigrationGenerator {
    /// Generator writing MySQL DDL into `output_dir`.
    pub fn new(output_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::with_dialect(output_dir, Box::new(MySqlDialect::new()))
    }

    pub fn with_dialect(
        output_dir: impl Into<std::path::PathBuf>,
        dialect: Box<dyn DdlDialect>,
    ) -> Self {
        Self {
            store: MigrationFileStore::new(output_dir),
            dialect,
            last_version: None,
        }
    }

    /// Synthesize up/down scripts for `changes` and write them to a new file.
    ///
    /// Changes are rendered in input order. Removals have no down statement;
    /// each one instead adds an `-- Irreversible:` line and the migration is
    /// marked non-reversible.
    pub fn generate(&mut self, changes: &[Change]) -> Result<Migration> {
        let (up_script, down_script, reversible) = self.render(changes)?;

        let version = self.next_version();
        let content = format!("{}\n{}", up_script, down_script);
        let checksum = checksum(&content);

        let path = self.store.create(&version, &content)?;

        if !reversible {
            warn!(
                "Migration {} contains destructive changes and cannot be rolled back",
                version
            );
        }
        info!("Migration {} written to {}", version, path.display());

        Ok(Migration {
            version,
            up_script,
            down_script,
            checksum,
            reversible,
            path,
        })
    }

    fn render(&self, changes: &[Change]) -> Result<(String, String, bool)> {
        let mut up = format!("{}\n", UP_MARKER);
        let mut down = format!("{}\n", DOWN_MARKER);
        let mut reversible = true;

        for change in changes {
            debug!("Rendering change: {}", change);
            let (up_sql, down_sql) = self.render_change(change)?;

            up.push_str(&up_sql);
            up.push('\n');

            match down_sql {
                Some(sql) => {
                    down.push_str(&sql);
                    down.push('\n');
                }
                None => {
                    reversible = false;
                    down.push_str(&format!(
                        "{} {} {}\n",
                        IRREVERSIBLE_MARKER,
                        change.target,
                        change.describe_detail()
                    ));
                }
            }
        }

        Ok((up, down, reversible))
    }

    /// Up statement and, when reversible, the matching down statement.
    fn render_change(&self, change: &Change) -> Result<(String, Option<String>)> {
        let d = self.dialect.as_ref();

        match (change.kind, &change.target, &change.detail) {
            (ChangeKind::Add, ChangeTarget::Table(table), ChangeDetail::Columns(columns)) => Ok((
                d.create_table(table, columns),
                Some(d.drop_table(table)),
            )),
            (ChangeKind::Add, ChangeTarget::Column { table, .. }, ChangeDetail::Column(column)) => {
                Ok((
                    d.add_column(table, column),
                    Some(d.drop_column(table, &column.name)),
                ))
            }
            (ChangeKind::Remove, ChangeTarget::Table(table), _) => Ok((d.drop_table(table), None)),
            (ChangeKind::Remove, ChangeTarget::Column { table, column }, _) => {
                Ok((d.drop_column(table, column), None))
            }
            (
                ChangeKind::Modify,
                ChangeTarget::Column { table, .. },
                ChangeDetail::Modified { from, to },
            ) => Ok((
                d.modify_column(table, to),
                Some(d.modify_column(table, from)),
            )),
            (kind, target, _) => Err(PivotError::UnsupportedChangeKind(format!(
                "{} {} with detail '{}'",
                kind,
                target,
                change.describe_detail()
            ))),
        }
    }

    /// Current time as a version, never at or before the last issued one.
    fn next_version(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_version {
            if now <= last {
                now = last + Duration::milliseconds(1);
            }
        }
        self.last_version = Some(now);
        now.format(VERSION_FORMAT).to_string()
    }
}
