use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Connection, Executor, Row};
use tracing::{debug, info};

use pivot_core::error::{PivotError, Result};
use pivot_core::migration::LedgerEntry;
use pivot_core::provider::{MigrationLedger, ProviderFuture, SchemaProvider};
use pivot_core::schema::{ColumnSchema, SchemaSnapshot, TableSchema};

use crate::migrations::split_sql_statements;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "schema_migrations";

const TABLES_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR) AS table_name
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        CAST(TABLE_NAME AS CHAR) AS table_name,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        CAST(COLUMN_TYPE AS CHAR) AS column_type,
        CAST(IS_NULLABLE AS CHAR) AS is_nullable,
        CAST(COLUMN_KEY AS CHAR) AS column_key,
        CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
        CAST(EXTRA AS CHAR) AS extra
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME, ORDINAL_POSITION
"#;

/// MySQL provider owning a single connection for the whole run.
///
/// The connection is opened once by [`connect`](SchemaProvider::connect) and
/// never pooled or re-established.
pub struct MySqlProvider {
    url: String,
    conn: Option<MySqlConnection>,
}

impl MySqlProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: None,
        }
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| PivotError::Connection("not connected".into()))
    }

    async fn read_schema(&mut self) -> Result<SchemaSnapshot> {
        let conn = self.conn()?;

        let tables: Vec<String> = sqlx::query_scalar(TABLES_QUERY)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| PivotError::Schema(format!("Failed to list tables: {}", e)))?;

        let rows = sqlx::query(COLUMNS_QUERY)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| PivotError::Schema(format!("Failed to list columns: {}", e)))?;

        let mut columns: IndexMap<String, TableSchema> = IndexMap::new();
        for row in &rows {
            let (table, name, column) = column_from_row(row)?;
            columns
                .entry(table)
                .or_default()
                .columns
                .insert(name, column);
        }

        let mut snapshot = SchemaSnapshot::new();
        for table in tables {
            let schema = columns.shift_remove(&table).unwrap_or_default();
            snapshot.insert_table(table, schema);
        }

        debug!("Captured schema with {} tables", snapshot.len());
        Ok(snapshot)
    }
}

fn column_from_row(row: &MySqlRow) -> Result<(String, String, ColumnSchema)> {
    let get = |name: &str| -> Result<Option<String>> {
        row.try_get::<Option<String>, _>(name)
            .map_err(|e| PivotError::Schema(format!("Failed to read {}: {}", name, e)))
    };

    let table = get("table_name")?.unwrap_or_default();
    let name = get("column_name")?.unwrap_or_default();
    let column = ColumnSchema {
        sql_type: get("column_type")?.unwrap_or_default(),
        nullable: get("is_nullable")?.as_deref() == Some("YES"),
        key: get("column_key")?.unwrap_or_default(),
        default: get("column_default")?,
        extra: get("extra")?.unwrap_or_default(),
    };

    Ok((table, name, column))
}

fn entry_from_row(row: &MySqlRow) -> Result<LedgerEntry> {
    let ledger_err = |e: sqlx::Error| PivotError::Ledger(format!("Failed to read ledger row: {}", e));

    Ok(LedgerEntry {
        version: row.try_get("version").map_err(ledger_err)?,
        applied_at: row
            .try_get::<DateTime<Utc>, _>("applied_at")
            .map_err(ledger_err)?,
        description: row
            .try_get::<Option<String>, _>("description")
            .map_err(ledger_err)?
            .unwrap_or_default(),
        checksum: row
            .try_get::<Option<String>, _>("checksum")
            .map_err(ledger_err)?
            .unwrap_or_default(),
    })
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

impl SchemaProvider for MySqlProvider {
    fn name(&self) -> &str {
        "mysql"
    }

    fn connect(&mut self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            let conn = MySqlConnection::connect(&self.url)
                .await
                .map_err(|e| PivotError::Connection(format!("Failed to connect: {}", e)))?;
            self.conn = Some(conn);
            info!("Connected to MySQL");
            Ok(())
        })
    }

    fn get_schema(&mut self) -> ProviderFuture<'_, SchemaSnapshot> {
        Box::pin(async move { self.read_schema().await })
    }

    fn apply_migration<'a>(&'a mut self, script: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let conn = self.conn()?;

            for statement in split_sql_statements(script) {
                debug!("Executing: {}", statement);
                Executor::execute(&mut *conn, sqlx::raw_sql(&statement))
                    .await
                    .map_err(|e| PivotError::Execution(format!("{}: {}", statement, e)))?;
            }

            Ok(())
        })
    }
}

impl MigrationLedger for MySqlProvider {
    fn init_ledger(&mut self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            let conn = self.conn()?;
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS schema_migrations (
                    version VARCHAR(50) PRIMARY KEY,
                    applied_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                    description TEXT,
                    checksum VARCHAR(64)
                )
                "#,
            )
            .execute(&mut *conn)
            .await
            .map_err(|e| PivotError::Ledger(format!("Failed to create ledger table: {}", e)))?;
            Ok(())
        })
    }

    fn is_applied<'a>(&'a mut self, version: &'a str) -> ProviderFuture<'a, bool> {
        Box::pin(async move {
            let conn = self.conn()?;
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations WHERE version = ?")
                    .bind(version)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|e| {
                        PivotError::Ledger(format!(
                            "Failed to check if migration {} is applied: {}",
                            version, e
                        ))
                    })?;
            Ok(count > 0)
        })
    }

    fn last_applied(&mut self) -> ProviderFuture<'_, Option<LedgerEntry>> {
        Box::pin(async move {
            let conn = self.conn()?;
            let row = sqlx::query(
                r#"
                SELECT version, applied_at, description, checksum
                FROM schema_migrations
                ORDER BY applied_at DESC, version DESC
                LIMIT 1
                "#,
            )
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                PivotError::Ledger(format!("Failed to get last applied migration: {}", e))
            })?;

            row.as_ref().map(entry_from_row).transpose()
        })
    }

    fn applied_migrations(&mut self) -> ProviderFuture<'_, Vec<LedgerEntry>> {
        Box::pin(async move {
            let conn = self.conn()?;
            let rows = sqlx::query(
                r#"
                SELECT version, applied_at, description, checksum
                FROM schema_migrations
                ORDER BY version ASC
                "#,
            )
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| PivotError::Ledger(format!("Failed to fetch migrations: {}", e)))?;

            rows.iter().map(entry_from_row).collect()
        })
    }

    fn record<'a>(&'a mut self, entry: &'a LedgerEntry) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let conn = self.conn()?;
            sqlx::query(
                r#"
                INSERT INTO schema_migrations (version, applied_at, description, checksum)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&entry.version)
            .bind(entry.applied_at)
            .bind(&entry.description)
            .bind(&entry.checksum)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    PivotError::Ledger(format!("Migration {} is already recorded", entry.version))
                } else {
                    PivotError::Ledger(format!(
                        "Failed to record migration {}: {}",
                        entry.version, e
                    ))
                }
            })?;
            Ok(())
        })
    }

    fn remove<'a>(&'a mut self, version: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let conn = self.conn()?;
            sqlx::query("DELETE FROM schema_migrations WHERE version = ?")
                .bind(version)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    PivotError::Ledger(format!(
                        "Failed to remove migration record {}: {}",
                        version, e
                    ))
                })?;
            Ok(())
        })
    }
}
