//! Result sets, digests, and pretty printing for the comparison step.

use sha2::{Digest, Sha256};

/// A query result: column names plus rows of nullable cell texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        assert_eq!(row.len(), self.columns.len(), "row arity mismatch");
        self.rows.push(row);
    }

    /// Length-prefixed cell encoding so `("a", "b")` and `("ab", "")` never
    /// collide, with a distinct marker for NULL.
    fn encode_row(row: &[Option<String>]) -> Vec<u8> {
        let mut buf = Vec::new();
        for cell in row {
            match cell {
                None => buf.push(0u8),
                Some(text) => {
                    buf.push(1u8);
                    buf.extend_from_slice(&(text.len() as u64).to_le_bytes());
                    buf.extend_from_slice(text.as_bytes());
                }
            }
        }
        buf
    }

    fn digest_of(&self, encoded_rows: &[Vec<u8>]) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.columns.len() as u64).to_le_bytes());
        for row in encoded_rows {
            hasher.update((row.len() as u64).to_le_bytes());
            hasher.update(row);
        }
        let out = hasher.finalize();
        out.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Row-order-insensitive digest: rows are sorted by their encoding
    /// before hashing. Use when the SQL imposes no ordering.
    pub fn ordered_digest(&self) -> String {
        let mut encoded: Vec<Vec<u8>> = self.rows.iter().map(|r| Self::encode_row(r)).collect();
        encoded.sort();
        self.digest_of(&encoded)
    }

    /// Row-order-sensitive digest for `order by` results.
    pub fn data_digest(&self) -> String {
        let encoded: Vec<Vec<u8>> = self.rows.iter().map(|r| Self::encode_row(r)).collect();
        self.digest_of(&encoded)
    }

    /// Aligned text table for divergence reports.
    pub fn pretty_print(&self) -> String {
        let cell = |c: &Option<String>| -> String {
            c.clone().unwrap_or_else(|| "NULL".to_string())
        };
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, c) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell(c).len());
            }
        }
        let mut out = String::new();
        let fmt_row = |cells: Vec<String>, widths: &[usize]| -> String {
            let body = cells
                .iter()
                .zip(widths)
                .map(|(c, w)| format!("{c:<width$}", width = *w))
                .collect::<Vec<_>>()
                .join(" | ");
            format!("| {body} |\n")
        };
        out.push_str(&fmt_row(self.columns.clone(), &widths));
        let rule: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+\n";
        out.push_str(&rule);
        for row in &self.rows {
            out.push_str(&fmt_row(row.iter().map(cell).collect(), &widths));
        }
        out
    }
}

/// What an executor got back: a result set for queries, a row count for
/// exec-style statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlOutcome {
    Rows(ResultSet),
    Exec { rows_affected: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(rows: Vec<Vec<Option<&str>>>) -> ResultSet {
        let mut set = ResultSet::new(vec!["a".to_string(), "b".to_string()]);
        for row in rows {
            set.push_row(row.into_iter().map(|c| c.map(str::to_string)).collect());
        }
        set
    }

    #[test]
    fn ordered_digest_ignores_row_order() {
        let x = rs(vec![vec![Some("1"), Some("2")], vec![Some("3"), None]]);
        let y = rs(vec![vec![Some("3"), None], vec![Some("1"), Some("2")]]);
        assert_eq!(x.ordered_digest(), y.ordered_digest());
        assert_ne!(x.data_digest(), y.data_digest());
    }

    #[test]
    fn digests_distinguish_null_from_empty() {
        let with_null = rs(vec![vec![None, Some("x")]]);
        let with_empty = rs(vec![vec![Some(""), Some("x")]]);
        assert_ne!(with_null.ordered_digest(), with_empty.ordered_digest());
    }

    #[test]
    fn cell_boundaries_do_not_collide() {
        let ab = rs(vec![vec![Some("ab"), Some("")]]);
        let a_b = rs(vec![vec![Some("a"), Some("b")]]);
        assert_ne!(ab.data_digest(), a_b.data_digest());
    }

    #[test]
    fn pretty_print_contains_all_cells() {
        let set = rs(vec![vec![Some("hello"), None]]);
        let text = set.pretty_print();
        assert!(text.contains("hello"));
        assert!(text.contains("NULL"));
        assert!(text.contains('|'));
    }
}
