use pivot_core::schema::{Change, ColumnDef, SchemaSnapshot, TableSchema};

/// Computes structural changes between two snapshots.
///
/// Only table and column presence, column type and nullability are compared.
/// Key, default and extra attributes never produce changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compare `previous` to `current`.
    ///
    /// Changes are ordered: for each table of `current` in capture order, either
    /// an `Add/table` or that table's column changes (adds and modifies, then
    /// removals); then one `Remove/table` per table only in `previous`.
    pub fn compare(&self, previous: &SchemaSnapshot, current: &SchemaSnapshot) -> Vec<Change> {
        let mut changes = Vec::new();

        for (name, table) in current.tables() {
            match previous.table(name) {
                None => {
                    let columns = table
                        .columns
                        .iter()
                        .map(|(col, schema)| ColumnDef::new(col, &schema.sql_type, schema.nullable))
                        .collect();
                    changes.push(Change::add_table(name, columns));
                }
                Some(prev) => Self::compare_columns(name, prev, table, &mut changes),
            }
        }

        for (name, _) in previous.tables() {
            if !current.contains_table(name) {
                changes.push(Change::remove_table(name));
            }
        }

        changes
    }

    fn compare_columns(
        table: &str,
        previous: &TableSchema,
        current: &TableSchema,
        changes: &mut Vec<Change>,
    ) {
        for (name, column) in &current.columns {
            let to = ColumnDef::new(name, &column.sql_type, column.nullable);
            match previous.column(name) {
                None => changes.push(Change::add_column(table, to)),
                Some(prev) if prev.differs_structurally(column) => {
                    let from = ColumnDef::new(name, &prev.sql_type, prev.nullable);
                    changes.push(Change::modify_column(table, from, to));
                }
                Some(_) => {}
            }
        }

        for name in previous.columns.keys() {
            if current.column(name).is_none() {
                changes.push(Change::remove_column(table, name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivot_core::schema::{ChangeDetail, ChangeKind, ChangeTarget, ColumnSchema};

    fn users() -> TableSchema {
        TableSchema::new()
            .with_column("id", ColumnSchema::new("INT", false))
            .with_column("name", ColumnSchema::new("VARCHAR(100)", true))
    }

    #[test]
    fn test_identical_snapshots_have_no_changes() {
        let snapshot = SchemaSnapshot::new()
            .with_table("users", users())
            .with_table(
                "orders",
                TableSchema::new().with_column("id", ColumnSchema::new("BIGINT", false)),
            );

        assert!(DiffEngine::new().compare(&snapshot, &snapshot).is_empty());
        assert!(DiffEngine::new()
            .compare(&SchemaSnapshot::new(), &SchemaSnapshot::new())
            .is_empty());
    }

    #[test]
    fn test_disjoint_tables() {
        let previous = SchemaSnapshot::new()
            .with_table("legacy", users())
            .with_table("audit", users());
        let current = SchemaSnapshot::new().with_table("users", users());

        let changes = DiffEngine::new().compare(&previous, &current);
        assert_eq!(changes.len(), 3);

        let adds: Vec<_> = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Add)
            .map(|c| c.target.clone())
            .collect();
        assert_eq!(adds, vec![ChangeTarget::Table("users".into())]);

        let removes: Vec<_> = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Remove)
            .map(|c| c.target.table().to_string())
            .collect();
        assert_eq!(removes, vec!["legacy", "audit"]);
    }

    #[test]
    fn test_single_type_change_is_one_modify() {
        let previous = SchemaSnapshot::new().with_table("users", users());
        let current = SchemaSnapshot::new().with_table(
            "users",
            TableSchema::new()
                .with_column("id", ColumnSchema::new("BIGINT", false))
                .with_column("name", ColumnSchema::new("VARCHAR(100)", true)),
        );

        let changes = DiffEngine::new().compare(&previous, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modify);
        assert_eq!(
            changes[0].target,
            ChangeTarget::Column {
                table: "users".into(),
                column: "id".into()
            }
        );
        assert_eq!(changes[0].detail.to_string(), "type BIGINT from INT");
        match &changes[0].detail {
            ChangeDetail::Modified { from, to } => {
                assert_eq!(from.sql_type, "INT");
                assert_eq!(to.sql_type, "BIGINT");
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn test_nullability_change_is_modify() {
        let previous = SchemaSnapshot::new().with_table("users", users());
        let current = SchemaSnapshot::new().with_table(
            "users",
            TableSchema::new()
                .with_column("id", ColumnSchema::new("INT", false))
                .with_column("name", ColumnSchema::new("VARCHAR(100)", false)),
        );

        let changes = DiffEngine::new().compare(&previous, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].detail.to_string(),
            "type VARCHAR(100) from VARCHAR(100) NULL"
        );
    }

    #[test]
    fn test_added_and_removed_columns() {
        let previous = SchemaSnapshot::new().with_table("users", users());
        let current = SchemaSnapshot::new().with_table(
            "users",
            TableSchema::new()
                .with_column("id", ColumnSchema::new("INT", false))
                .with_column("email", ColumnSchema::new("VARCHAR(255)", true)),
        );

        let changes = DiffEngine::new().compare(&previous, &current);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::Add);
        assert_eq!(changes[0].detail.to_string(), "type VARCHAR(255) NULL");
        assert_eq!(changes[1].kind, ChangeKind::Remove);
        assert_eq!(changes[1].to_string(), "remove column:users.name: column removed");
    }

    #[test]
    fn test_key_default_and_extra_are_ignored() {
        let previous = SchemaSnapshot::new().with_table("users", users());

        let mut id = ColumnSchema::new("INT", false);
        id.key = "PRI".into();
        id.extra = "auto_increment".into();
        id.default = Some("0".into());
        let current = SchemaSnapshot::new().with_table(
            "users",
            TableSchema::new()
                .with_column("id", id)
                .with_column("name", ColumnSchema::new("VARCHAR(100)", true)),
        );

        assert!(DiffEngine::new().compare(&previous, &current).is_empty());
    }

    #[test]
    fn test_new_table_detail_from_json() {
        let previous = SchemaSnapshot::from_json("{}").unwrap();
        let current = SchemaSnapshot::from_json(
            r#"{"users": {"columns": {"id": {"type": "INT", "null": false}}}}"#,
        )
        .unwrap();

        let changes = DiffEngine::new().compare(&previous, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to_string(), "add table:users: id INT NOT NULL");
    }
}
