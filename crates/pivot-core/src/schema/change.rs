use std::fmt;

/// Kind of structural delta between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Remove,
    Modify,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Remove => write!(f, "remove"),
            ChangeKind::Modify => write!(f, "modify"),
        }
    }
}

/// What a change applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    Table(String),
    Column { table: String, column: String },
}

impl ChangeTarget {
    /// The table this target belongs to.
    pub fn table(&self) -> &str {
        match self {
            ChangeTarget::Table(table) => table,
            ChangeTarget::Column { table, .. } => table,
        }
    }
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTarget::Table(table) => write!(f, "table:{}", table),
            ChangeTarget::Column { table, column } => write!(f, "column:{}.{}", table, column),
        }
    }
}

/// Name, type and nullability of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable,
        }
    }

    fn null_suffix(&self) -> &'static str {
        if self.nullable {
            " NULL"
        } else {
            ""
        }
    }
}

/// Typed payload of a change.
///
/// The `Display` form is the human-readable detail line shown by `diff`;
/// script synthesis reads the fields directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDetail {
    /// Full column list of a new table.
    Columns(Vec<ColumnDef>),
    /// A single new column.
    Column(ColumnDef),
    /// A column whose type or nullability changed.
    Modified { from: ColumnDef, to: ColumnDef },
    /// The target no longer exists.
    Removed,
}

impl fmt::Display for ChangeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeDetail::Columns(columns) => {
                let defs: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let null = if c.nullable { "NULL" } else { "NOT NULL" };
                        format!("{} {} {}", c.name, c.sql_type, null)
                    })
                    .collect();
                write!(f, "{}", defs.join(",\n"))
            }
            ChangeDetail::Column(column) => {
                write!(f, "type {}{}", column.sql_type, column.null_suffix())
            }
            ChangeDetail::Modified { from, to } => write!(
                f,
                "type {}{} from {}{}",
                to.sql_type,
                to.null_suffix(),
                from.sql_type,
                from.null_suffix()
            ),
            ChangeDetail::Removed => write!(f, "removed"),
        }
    }
}

/// One structural delta between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub target: ChangeTarget,
    pub detail: ChangeDetail,
}

impl Change {
    pub fn add_table(table: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            kind: ChangeKind::Add,
            target: ChangeTarget::Table(table.into()),
            detail: ChangeDetail::Columns(columns),
        }
    }

    pub fn remove_table(table: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Remove,
            target: ChangeTarget::Table(table.into()),
            detail: ChangeDetail::Removed,
        }
    }

    pub fn add_column(table: impl Into<String>, column: ColumnDef) -> Self {
        Self {
            kind: ChangeKind::Add,
            target: ChangeTarget::Column {
                table: table.into(),
                column: column.name.clone(),
            },
            detail: ChangeDetail::Column(column),
        }
    }

    pub fn modify_column(table: impl Into<String>, from: ColumnDef, to: ColumnDef) -> Self {
        Self {
            kind: ChangeKind::Modify,
            target: ChangeTarget::Column {
                table: table.into(),
                column: to.name.clone(),
            },
            detail: ChangeDetail::Modified { from, to },
        }
    }

    pub fn remove_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Remove,
            target: ChangeTarget::Column {
                table: table.into(),
                column: column.into(),
            },
            detail: ChangeDetail::Removed,
        }
    }

    /// Whether applying this change destroys data that a down-script cannot restore.
    pub fn is_destructive(&self) -> bool {
        self.kind == ChangeKind::Remove
    }

    /// Detail line, with `Removed` rendered against its target.
    pub fn describe_detail(&self) -> String {
        match (&self.detail, &self.target) {
            (ChangeDetail::Removed, ChangeTarget::Table(_)) => "table removed".to_string(),
            (ChangeDetail::Removed, ChangeTarget::Column { .. }) => "column removed".to_string(),
            (detail, _) => detail.to_string(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.target, self.describe_detail())
    }
}
