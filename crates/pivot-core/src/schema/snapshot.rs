use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PivotError, Result};

/// Point-in-time capture of a database's tables and columns.
///
/// Serializes as a JSON object keyed by table name:
/// `{ "users": { "columns": { "id": { "type": "INT", "null": false, ... } } } }`.
/// Table and column order is preserved as captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    tables: IndexMap<String, TableSchema>,
}

impl SchemaSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a snapshot from its JSON form.
    ///
    /// Every table entry must carry a `columns` object; a missing or
    /// non-object `columns` fails with [`PivotError::InvalidSchema`].
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: IndexMap<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| PivotError::Schema(format!("Failed to parse snapshot: {}", e)))?;

        let mut tables = IndexMap::with_capacity(raw.len());
        for (name, value) in raw {
            match value.get("columns") {
                Some(columns) if columns.is_object() => {}
                Some(_) => {
                    return Err(PivotError::InvalidSchema {
                        table: name,
                        reason: "columns is not an object".into(),
                    })
                }
                None => {
                    return Err(PivotError::InvalidSchema {
                        table: name,
                        reason: "missing columns map".into(),
                    })
                }
            }

            let table: TableSchema =
                serde_json::from_value(value).map_err(|e| PivotError::InvalidSchema {
                    table: name.clone(),
                    reason: e.to_string(),
                })?;
            tables.insert(name, table);
        }

        Ok(Self { tables })
    }

    /// Render the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add or replace a table.
    pub fn insert_table(&mut self, name: impl Into<String>, table: TableSchema) {
        self.tables.insert(name.into(), table);
    }

    /// Builder-style variant of [`insert_table`](Self::insert_table).
    pub fn with_table(mut self, name: impl Into<String>, table: TableSchema) -> Self {
        self.insert_table(name, table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterate tables in capture order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableSchema)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Columns of a single table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: IndexMap<String, ColumnSchema>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, column: ColumnSchema) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.get(name)
    }
}

/// A single column as reported by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Dialect DDL type token, e.g. `varchar(100)`.
    #[serde(rename = "type", default)]
    pub sql_type: String,

    /// Whether the column accepts NULL.
    #[serde(rename = "null", default)]
    pub nullable: bool,

    /// Key role (`PRI`, `UNI`, `MUL` or empty).
    #[serde(default)]
    pub key: String,

    /// Default literal, if any.
    #[serde(default)]
    pub default: Option<String>,

    /// Extra attribute such as `auto_increment`.
    #[serde(default)]
    pub extra: String,
}

impl ColumnSchema {
    pub fn new(sql_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            sql_type: sql_type.into(),
            nullable,
            ..Default::default()
        }
    }

    /// Whether type or nullability differ. Key, default and extra are ignored.
    pub fn differs_structurally(&self, other: &ColumnSchema) -> bool {
        self.sql_type != other.sql_type || self.nullable != other.nullable
    }
}
