mod change;
mod snapshot;

pub use change::{Change, ChangeDetail, ChangeKind, ChangeTarget, ColumnDef};
pub use snapshot::{ColumnSchema, SchemaSnapshot, TableSchema};
