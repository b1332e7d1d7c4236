//! DDL rendering per database dialect.

use pivot_core::schema::ColumnDef;

/// Type used when a column carries no type token.
pub const DEFAULT_COLUMN_TYPE: &str = "VARCHAR(255)";

/// Renders the DDL statements a migration is made of.
///
/// Each method returns one complete statement including the trailing `;`.
pub trait DdlDialect: Send + Sync {
    fn name(&self) -> &str;

    /// `CREATE TABLE`; an empty column list yields a single synthetic key column.
    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> String;

    fn drop_table(&self, table: &str) -> String;

    fn add_column(&self, table: &str, column: &ColumnDef) -> String;

    fn drop_column(&self, table: &str, column: &str) -> String;

    /// Redefine a column to the given type and nullability.
    fn modify_column(&self, table: &str, column: &ColumnDef) -> String;
}

/// MySQL/MariaDB DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub fn new() -> Self {
        Self
    }

    fn column_type(column: &ColumnDef) -> &str {
        let ty = column.sql_type.trim();
        if ty.is_empty() {
            DEFAULT_COLUMN_TYPE
        } else {
            ty
        }
    }

    fn column_spec(column: &ColumnDef) -> String {
        let null = if column.nullable { "NULL" } else { "NOT NULL" };
        format!("{} {}", Self::column_type(column), null)
    }
}

impl DdlDialect for MySqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> String {
        let definition = if columns.is_empty() {
            "id INT AUTO_INCREMENT PRIMARY KEY".to_string()
        } else {
            columns
                .iter()
                .map(|c| format!("{} {}", c.name, Self::column_spec(c)))
                .collect::<Vec<_>>()
                .join(",\n")
        };
        format!("CREATE TABLE {} (\n{}\n);", table, definition)
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {};", table)
    }

    fn add_column(&self, table: &str, column: &ColumnDef) -> String {
        format!(
            "ALTER TABLE {} ADD {} {};",
            table,
            column.name,
            Self::column_spec(column)
        )
    }

    fn drop_column(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {};", table, column)
    }

    fn modify_column(&self, table: &str, column: &ColumnDef) -> String {
        format!(
            "ALTER TABLE {} MODIFY {} {};",
            table,
            column.name,
            Self::column_spec(column)
        )
    }
}
