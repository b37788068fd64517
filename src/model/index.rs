use serde::{Deserialize, Serialize};

use super::{ColumnId, IndexId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Primary,
    Unique,
    NonUnique,
}

/// One key part: a column reference plus an optional prefix length for
/// string-family columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub column: ColumnId,
    pub prefix: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub id: IndexId,
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
}

impl Index {
    pub fn new(id: IndexId, kind: IndexKind, columns: Vec<IndexColumn>) -> Self {
        Self {
            id,
            name: format!("i{id}"),
            kind,
            columns,
        }
    }

    /// Primary keys are unique by definition.
    pub fn is_unique(&self) -> bool {
        matches!(self.kind, IndexKind::Primary | IndexKind::Unique)
    }

    pub fn contains_column(&self, column: ColumnId) -> bool {
        self.columns.iter().any(|c| c.column == column)
    }

    /// Add a trailing key part for `column` unless it is already present.
    pub fn append_column_if_missing(&mut self, column: ColumnId) {
        if !self.contains_column(column) {
            self.columns.push(IndexColumn {
                column,
                prefix: None,
            });
        }
    }

    /// `primary` / `unique` / empty, combined with `key` by the caller.
    pub fn kind_keyword(&self) -> &'static str {
        match self.kind {
            IndexKind::Primary => "primary",
            IndexKind::Unique => "unique",
            IndexKind::NonUnique => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_column_if_missing_is_idempotent() {
        let mut idx = Index::new(
            IndexId(3),
            IndexKind::Unique,
            vec![IndexColumn {
                column: ColumnId(1),
                prefix: None,
            }],
        );
        idx.append_column_if_missing(ColumnId(2));
        idx.append_column_if_missing(ColumnId(2));
        idx.append_column_if_missing(ColumnId(1));
        assert_eq!(idx.columns.len(), 2);
        assert_eq!(idx.name, "i3");
    }

    #[test]
    fn primary_counts_as_unique() {
        let idx = Index::new(IndexId(0), IndexKind::Primary, Vec::new());
        assert!(idx.is_unique());
        assert_eq!(idx.kind_keyword(), "primary");
    }
}
