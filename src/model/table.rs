use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{Column, ColumnId, Index, IndexColumn, IndexId, IndexKind, TableId};
use crate::rng::{frequency, pick_index, random_bool, random_int};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<Column>,
    pub indices: Vec<Index>,
    pub partition_columns: Vec<ColumnId>,
    /// Sampled rows appended by initialization inserts; per-column literal
    /// strings kept aligned with `columns` across schema changes.
    pub values: Vec<Vec<String>>,
    /// Scratch consumed destructively by index-merge predicate generation.
    pub col_for_prefix_index: Vec<ColumnId>,
    /// Tables cloned from this one via `create table … like`.
    pub child_tables: Vec<TableId>,
}

impl Table {
    pub fn new(id: TableId) -> Self {
        Self {
            id,
            name: format!("t{id}"),
            columns: Vec::new(),
            indices: Vec::new(),
            partition_columns: Vec::new(),
            values: Vec::new(),
            col_for_prefix_index: Vec::new(),
            child_tables: Vec::new(),
        }
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .unwrap_or_else(|| panic!("{}: unknown column c{id}", self.name))
    }

    pub fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        let name = self.name.clone();
        self.columns
            .iter_mut()
            .find(|c| c.id == id)
            .unwrap_or_else(|| panic!("{name}: unknown column c{id}"))
    }

    pub fn column_pos(&self, id: ColumnId) -> usize {
        self.columns
            .iter()
            .position(|c| c.id == id)
            .unwrap_or_else(|| panic!("{}: unknown column c{id}", self.name))
    }

    pub fn index(&self, id: IndexId) -> &Index {
        self.indices
            .iter()
            .find(|i| i.id == id)
            .unwrap_or_else(|| panic!("{}: unknown index i{id}", self.name))
    }

    /// Append a column, extending every sampled row with the column's
    /// default (or `NULL`) to keep the buffer aligned.
    pub fn append_column(&mut self, column: Column) {
        let filler = column
            .default_value
            .clone()
            .unwrap_or_else(|| "NULL".to_string());
        for row in &mut self.values {
            row.push(filler.clone());
        }
        self.columns.push(column);
    }

    /// A column is droppable unless it is the last one, the sole primary-key
    /// column, or a partition key.
    pub fn is_droppable(&self, id: ColumnId) -> bool {
        if self.columns.len() <= 1 {
            return false;
        }
        if self.column(id).is_partition_key {
            return false;
        }
        match self.primary_key_index() {
            Some(pk) => !(pk.columns.len() == 1 && pk.contains_column(id)),
            None => true,
        }
    }

    pub fn has_droppable_column(&self) -> bool {
        self.columns.iter().any(|c| self.is_droppable(c.id))
    }

    pub fn rand_droppable_column(&self, rng: &mut ChaCha8Rng) -> Option<ColumnId> {
        let candidates: Vec<ColumnId> = self
            .columns
            .iter()
            .filter(|c| self.is_droppable(c.id))
            .map(|c| c.id)
            .collect();
        if candidates.is_empty() {
            None
        } else {
            Some(candidates[pick_index(candidates.len(), rng)])
        }
    }

    /// Remove a column, its sampled values, and its key parts; indexes left
    /// without key parts are dropped with it.
    pub fn remove_column(&mut self, id: ColumnId) -> Column {
        assert!(
            self.is_droppable(id),
            "{}: column c{id} is not droppable",
            self.name
        );
        let pos = self.column_pos(id);
        for row in &mut self.values {
            row.remove(pos);
        }
        for idx in &mut self.indices {
            idx.columns.retain(|ic| ic.column != id);
        }
        self.indices.retain(|i| !i.columns.is_empty());
        self.columns.remove(pos)
    }

    /// Swap `old` for `new` in place, preserving position and rewriting any
    /// key parts that referenced the old column. Partition-key status stays
    /// with the position.
    pub fn replace_column(&mut self, old: ColumnId, mut new: Column) {
        let pos = self.column_pos(old);
        new.is_partition_key = self.columns[pos].is_partition_key;
        for idx in &mut self.indices {
            for ic in &mut idx.columns {
                if ic.column == old {
                    ic.column = new.id;
                    ic.prefix = if new.tp.needs_index_prefix() {
                        Some(4)
                    } else if new.tp.is_string() {
                        ic.prefix.filter(|p| *p <= new.len)
                    } else {
                        None
                    };
                }
            }
        }
        if let Some(p) = self.partition_columns.iter_mut().find(|c| **c == old) {
            *p = new.id;
        }
        self.columns[pos] = new;
    }

    /// Append an index; unique (and primary) indexes first absorb every
    /// partition column they are missing.
    pub fn append_index(&mut self, mut index: Index) {
        if index.kind == IndexKind::Primary {
            assert!(
                self.primary_key_index().is_none(),
                "{}: second primary index",
                self.name
            );
        }
        if index.is_unique() {
            for pc in &self.partition_columns {
                index.append_column_if_missing(*pc);
            }
        }
        self.indices.push(index);
    }

    pub fn remove_index(&mut self, id: IndexId) -> Index {
        let pos = self
            .indices
            .iter()
            .position(|i| i.id == id)
            .unwrap_or_else(|| panic!("{}: unknown index i{id}", self.name));
        self.indices.remove(pos)
    }

    pub fn append_partition_column(&mut self, id: ColumnId) {
        self.column_mut(id).is_partition_key = true;
        self.partition_columns.push(id);
    }

    /// One literal per requested column, each obeying its type.
    pub fn gen_rand_values(&self, cols: &[ColumnId], rng: &mut ChaCha8Rng) -> Vec<String> {
        cols.iter()
            .map(|c| self.column(*c).random_value(rng))
            .collect()
    }

    pub fn append_row(&mut self, row: Vec<String>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "{}: row arity mismatch",
            self.name
        );
        self.values.push(row);
    }

    /// Project a random sampled row onto `cols`.
    pub fn rand_row(&self, cols: &[ColumnId], rng: &mut ChaCha8Rng) -> Vec<String> {
        assert!(!self.values.is_empty());
        let row = &self.values[pick_index(self.values.len(), rng)];
        cols.iter().map(|c| row[self.column_pos(*c)].clone()).collect()
    }

    pub fn rand_row_val(&self, col: ColumnId, rng: &mut ChaCha8Rng) -> Option<String> {
        if self.values.is_empty() {
            return None;
        }
        let row = &self.values[pick_index(self.values.len(), rng)];
        Some(row[self.column_pos(col)].clone())
    }

    pub fn rand_column(&self, rng: &mut ChaCha8Rng) -> &Column {
        &self.columns[pick_index(self.columns.len(), rng)]
    }

    /// Random subset of columns in declaration order; may be empty, which
    /// callers render as `*`.
    pub fn rand_columns(&self, rng: &mut ChaCha8Rng) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|_| random_bool(rng))
            .map(|c| c.id)
            .collect()
    }

    pub fn rand_columns_non_empty(&self, rng: &mut ChaCha8Rng) -> Vec<ColumnId> {
        let cols = self.rand_columns(rng);
        if cols.is_empty() {
            vec![self.rand_column(rng).id]
        } else {
            cols
        }
    }

    /// Random subset that always includes every column an insert cannot
    /// omit under strict mode (not nullable, no default).
    pub fn rand_columns_with_defaults(&self, rng: &mut ChaCha8Rng) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|c| (!c.nullable && c.default_value.is_none()) || random_bool(rng))
            .map(|c| c.id)
            .collect()
    }

    pub fn rand_column_simple(&self, rng: &mut ChaCha8Rng) -> ColumnId {
        self.rand_column(rng).id
    }

    /// Bias toward indexed columns when any index exists.
    pub fn rand_column_prefer_index(&self, rng: &mut ChaCha8Rng) -> ColumnId {
        if !self.indices.is_empty() && random_int(rng, 0, 3) != 0 {
            let idx = &self.indices[pick_index(self.indices.len(), rng)];
            idx.columns[pick_index(idx.columns.len(), rng)].column
        } else {
            self.rand_column_simple(rng)
        }
    }

    /// Choose between any column and the first column of a random index,
    /// with the given weights.
    pub fn rand_index_first_column_weighted(
        &self,
        w_common: u32,
        w_index: u32,
        rng: &mut ChaCha8Rng,
    ) -> ColumnId {
        if self.indices.is_empty() {
            return self.rand_column_simple(rng);
        }
        match frequency(&[w_common, w_index], rng) {
            Some(1) => {
                let idx = &self.indices[pick_index(self.indices.len(), rng)];
                idx.columns[0].column
            }
            _ => self.rand_column_simple(rng),
        }
    }

    pub fn rand_index(&self, rng: &mut ChaCha8Rng) -> Option<&Index> {
        if self.indices.is_empty() {
            None
        } else {
            Some(&self.indices[pick_index(self.indices.len(), rng)])
        }
    }

    pub fn rand_unique_index_for_point_get(&self, rng: &mut ChaCha8Rng) -> Option<IndexId> {
        let uniques: Vec<IndexId> = self
            .indices
            .iter()
            .filter(|i| i.is_unique())
            .map(|i| i.id)
            .collect();
        if uniques.is_empty() {
            None
        } else {
            Some(uniques[pick_index(uniques.len(), rng)])
        }
    }

    /// Leading columns of a random index; empty when the table has none.
    pub fn rand_index_prefix_columns(&self, rng: &mut ChaCha8Rng) -> Vec<ColumnId> {
        let Some(idx) = self.rand_index(rng) else {
            return Vec::new();
        };
        let k = random_int(rng, 1, idx.columns.len() as i64) as usize;
        idx.columns[..k].iter().map(|ic| ic.column).collect()
    }

    pub fn primary_key_index(&self) -> Option<&Index> {
        self.indices.iter().find(|i| i.kind == IndexKind::Primary)
    }

    /// An integer-typed column not yet serving as a partition key, if any.
    pub fn rand_column_for_partition(&self, rng: &mut ChaCha8Rng) -> Option<ColumnId> {
        let eligible: Vec<ColumnId> = self
            .columns
            .iter()
            .filter(|c| c.tp.is_integer() && !c.is_partition_key)
            .map(|c| c.id)
            .collect();
        if eligible.is_empty() {
            None
        } else {
            Some(eligible[pick_index(eligible.len(), rng)])
        }
    }

    /// Generate a fresh index over a random distinct column subset.
    pub fn random_new_index(
        &self,
        id: IndexId,
        allow_primary: bool,
        rng: &mut ChaCha8Rng,
    ) -> Index {
        let kind = if allow_primary
            && self.primary_key_index().is_none()
            && random_int(rng, 0, 3) == 0
        {
            IndexKind::Primary
        } else if random_int(rng, 0, 2) == 0 {
            IndexKind::Unique
        } else {
            IndexKind::NonUnique
        };
        let max_cols = self.columns.len().min(4);
        let want = random_int(rng, 1, max_cols as i64) as usize;
        let mut pool: Vec<usize> = (0..self.columns.len()).collect();
        let mut key_parts = Vec::with_capacity(want);
        for _ in 0..want {
            let at = pick_index(pool.len(), rng);
            let col = &self.columns[pool.swap_remove(at)];
            let prefix = if col.tp.needs_index_prefix() {
                Some(random_int(rng, 1, 8) as u32)
            } else if col.tp.is_string() && random_int(rng, 0, 3) == 0 {
                Some(random_int(rng, 1, col.len.min(8) as i64) as u32)
            } else {
                None
            };
            key_parts.push(IndexColumn {
                column: col.id,
                prefix,
            });
        }
        Index::new(id, kind, key_parts)
    }

    /// `n` rows over `cols`, ascending per column.
    pub fn gen_rows_asc(
        &self,
        cols: &[ColumnId],
        n: usize,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Vec<String>> {
        let per_col: Vec<Vec<String>> = cols
            .iter()
            .map(|c| {
                let mut vals = self.column(*c).random_values_asc(rng, n);
                // Tiny domains can run dry; pad by repeating the maximum so
                // every row stays full arity.
                while vals.len() < n {
                    let last = vals.last().cloned().unwrap_or_else(|| "0".to_string());
                    vals.push(last);
                }
                vals
            })
            .collect();
        (0..n)
            .map(|i| per_col.iter().map(|vs| vs[i].clone()).collect())
            .collect()
    }

    /// Ascending rows over the handle: primary-key columns when present,
    /// otherwise the hidden integer row id.
    pub fn gen_rows_asc_for_handle(&self, n: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<String>> {
        match self.primary_key_index() {
            Some(pk) => {
                let cols: Vec<ColumnId> = pk.columns.iter().map(|ic| ic.column).collect();
                self.gen_rows_asc(&cols, n, rng)
            }
            None => {
                let mut ids: Vec<i64> = (0..n).map(|_| random_int(rng, 0, 1 << 30)).collect();
                ids.sort_unstable();
                ids.into_iter().map(|v| vec![v.to_string()]).collect()
            }
        }
    }

    pub fn gen_rows_asc_for_index(
        &self,
        index: IndexId,
        n: usize,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Vec<String>> {
        let cols: Vec<ColumnId> = self.index(index).columns.iter().map(|ic| ic.column).collect();
        self.gen_rows_asc(&cols, n, rng)
    }

    pub fn is_full(&self, quota: usize) -> bool {
        self.values.len() >= quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::ColumnType;
    use rand::SeedableRng;

    fn int_column(id: u64) -> Column {
        Column {
            id: ColumnId(id),
            name: format!("c{id}"),
            tp: ColumnType::Int,
            len: 0,
            scale: 0,
            nullable: true,
            default_value: None,
            is_partition_key: false,
            members: Vec::new(),
        }
    }

    fn table_with_cols(n: u64) -> Table {
        let mut t = Table::new(TableId(0));
        for i in 0..n {
            t.append_column(int_column(i));
        }
        t
    }

    #[test]
    fn append_column_extends_sampled_rows() {
        let mut t = table_with_cols(2);
        t.append_row(vec!["1".into(), "2".into()]);
        t.append_column(int_column(7));
        assert_eq!(t.values[0].len(), 3);
        assert_eq!(t.values[0][2], "NULL");
    }

    #[test]
    fn remove_column_realigns_rows_and_indices() {
        let mut t = table_with_cols(3);
        t.append_index(Index::new(
            IndexId(0),
            IndexKind::NonUnique,
            vec![
                IndexColumn {
                    column: ColumnId(0),
                    prefix: None,
                },
                IndexColumn {
                    column: ColumnId(1),
                    prefix: None,
                },
            ],
        ));
        t.append_row(vec!["1".into(), "2".into(), "3".into()]);
        t.remove_column(ColumnId(1));
        assert_eq!(t.values[0], vec!["1".to_string(), "3".to_string()]);
        assert_eq!(t.indices[0].columns.len(), 1);
    }

    #[test]
    fn remove_column_drops_emptied_index() {
        let mut t = table_with_cols(2);
        t.append_index(Index::new(
            IndexId(0),
            IndexKind::NonUnique,
            vec![IndexColumn {
                column: ColumnId(1),
                prefix: None,
            }],
        ));
        t.remove_column(ColumnId(1));
        assert!(t.indices.is_empty());
    }

    #[test]
    #[should_panic(expected = "not droppable")]
    fn last_column_is_not_droppable() {
        let mut t = table_with_cols(1);
        t.remove_column(ColumnId(0));
    }

    #[test]
    fn sole_primary_key_column_is_not_droppable() {
        let mut t = table_with_cols(2);
        t.append_index(Index::new(
            IndexId(0),
            IndexKind::Primary,
            vec![IndexColumn {
                column: ColumnId(0),
                prefix: None,
            }],
        ));
        assert!(!t.is_droppable(ColumnId(0)));
        assert!(t.is_droppable(ColumnId(1)));
    }

    #[test]
    fn unique_index_absorbs_partition_columns() {
        let mut t = table_with_cols(3);
        t.append_partition_column(ColumnId(2));
        t.append_index(Index::new(
            IndexId(0),
            IndexKind::Unique,
            vec![IndexColumn {
                column: ColumnId(0),
                prefix: None,
            }],
        ));
        t.append_index(Index::new(
            IndexId(1),
            IndexKind::NonUnique,
            vec![IndexColumn {
                column: ColumnId(0),
                prefix: None,
            }],
        ));
        assert!(t.indices[0].contains_column(ColumnId(2)));
        assert!(!t.indices[1].contains_column(ColumnId(2)));
    }

    #[test]
    fn replace_column_keeps_position_and_rewrites_indices() {
        let mut t = table_with_cols(3);
        t.append_index(Index::new(
            IndexId(0),
            IndexKind::NonUnique,
            vec![IndexColumn {
                column: ColumnId(1),
                prefix: None,
            }],
        ));
        t.replace_column(ColumnId(1), int_column(9));
        assert_eq!(t.columns[1].id, ColumnId(9));
        assert_eq!(t.indices[0].columns[0].column, ColumnId(9));
    }

    #[test]
    #[should_panic(expected = "arity mismatch")]
    fn append_row_rejects_wrong_arity() {
        let mut t = table_with_cols(2);
        t.append_row(vec!["1".into()]);
    }

    #[test]
    fn handle_rows_are_ascending() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let t = table_with_cols(2);
        let rows = t.gen_rows_asc_for_handle(4, &mut rng);
        assert_eq!(rows.len(), 4);
        let vals: Vec<i64> = rows.iter().map(|r| r[0].parse().unwrap()).collect();
        let mut sorted = vals.clone();
        sorted.sort_unstable();
        assert_eq!(vals, sorted);
    }
}
