//! In-memory catalog: the schema the generator believes exists on both
//! databases, mutated in lock-step with every emitted DDL/DML statement.

pub mod column;
pub mod index;
pub mod prepare;
pub mod table;

pub use column::{Column, ColumnType};
pub use index::{Index, IndexColumn, IndexKind};
pub use prepare::PreparedStatement;
pub use table::Table;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Globally unique table identifier; table `t<id>`.
    TableId
);
id_newtype!(
    /// Globally unique column identifier; column `c<id>`.
    ColumnId
);
id_newtype!(
    /// Globally unique index identifier; index `i<id>`.
    IndexId
);
id_newtype!(
    /// Globally unique prepared-statement identifier; statement `p<id>`.
    PrepareId
);

/// Kinds of monotonically increasing global ID allocators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Table,
    Column,
    Index,
    Prepare,
    TmpFile,
}
