//! Generator state: the catalog, ID allocators, scope store, deferred-SQL
//! queue, and the seeded random stream.
//!
//! Everything is single-threaded; productions mutate the state through this
//! one handle while the grammar is being evaluated.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::model::{
    Column, ColumnId, IdKind, Index, IndexId, PrepareId, PreparedStatement, Table, TableId,
};
use crate::profile::Profile;
use crate::rng::pick_index;
use crate::scope::{ScopeKey, ScopeObj, ScopeStack};

#[derive(Debug, Default)]
struct IdAllocators {
    table: u64,
    column: u64,
    index: u64,
    prepare: u64,
    tmp_file: u64,
}

impl IdAllocators {
    fn alloc(&mut self, kind: IdKind) -> u64 {
        let slot = match kind {
            IdKind::Table => &mut self.table,
            IdKind::Column => &mut self.column,
            IdKind::Index => &mut self.index,
            IdKind::Prepare => &mut self.prepare,
            IdKind::TmpFile => &mut self.tmp_file,
        };
        let id = *slot;
        *slot += 1;
        id
    }
}

pub struct State {
    profile: Profile,
    rng: ChaCha8Rng,
    tables: Vec<Table>,
    prepares: Vec<PreparedStatement>,
    ids: IdAllocators,
    scope: ScopeStack,
    deferred: VecDeque<String>,
    initialized: bool,
    clustered_enabled: bool,
}

impl State {
    /// Build a fresh state with an explicit seed; the seed fully determines
    /// the statement stream for a given profile.
    pub fn new(seed: u64, profile: Profile) -> Self {
        Self {
            profile,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tables: Vec::new(),
            prepares: Vec::new(),
            ids: IdAllocators::default(),
            scope: ScopeStack::new(),
            deferred: VecDeque::new(),
            initialized: false,
            clustered_enabled: true,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    // ---- initialization -------------------------------------------------

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Flips exactly once; calling it twice is a grammar bug.
    pub fn set_initialized(&mut self) {
        assert!(!self.initialized, "catalog initialized twice");
        self.initialized = true;
    }

    /// Initialization is done once enough tables exist and each one has met
    /// its row quota.
    pub fn meets_init_demand(&self) -> bool {
        self.tables.len() >= self.profile.init_table_count
            && self
                .tables
                .iter()
                .all(|t| t.is_full(self.profile.init_row_count))
    }

    pub fn first_non_full_table(&self) -> Option<TableId> {
        self.tables
            .iter()
            .find(|t| !t.is_full(self.profile.init_row_count))
            .map(|t| t.id)
    }

    // ---- catalog --------------------------------------------------------

    pub fn alloc_id(&mut self, kind: IdKind) -> u64 {
        self.ids.alloc(kind)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> &Table {
        self.tables
            .iter()
            .find(|t| t.id == id)
            .unwrap_or_else(|| panic!("unknown table t{id}"))
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut Table {
        self.tables
            .iter_mut()
            .find(|t| t.id == id)
            .unwrap_or_else(|| panic!("unknown table t{id}"))
    }

    /// Split borrow for samplers that need the table and the random stream
    /// at the same time.
    pub fn table_and_rng(&mut self, id: TableId) -> (&mut Table, &mut ChaCha8Rng) {
        let table = self
            .tables
            .iter_mut()
            .find(|t| t.id == id)
            .unwrap_or_else(|| panic!("unknown table t{id}"));
        (table, &mut self.rng)
    }

    pub fn append_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Allocate and append an empty table.
    pub fn new_table(&mut self) -> TableId {
        let id = TableId(self.alloc_id(IdKind::Table));
        self.tables.push(Table::new(id));
        id
    }

    /// Remove a table, scrubbing any child references pointing at it.
    pub fn remove_table(&mut self, id: TableId) -> Table {
        let pos = self
            .tables
            .iter()
            .position(|t| t.id == id)
            .unwrap_or_else(|| panic!("unknown table t{id}"));
        let table = self.tables.remove(pos);
        for t in &mut self.tables {
            t.child_tables.retain(|c| *c != id);
        }
        table
    }

    pub fn rand_table(&mut self) -> TableId {
        assert!(!self.tables.is_empty(), "no tables in the catalog");
        let i = pick_index(self.tables.len(), &mut self.rng);
        self.tables[i].id
    }

    /// Allocate a new random column and append it to the table.
    pub fn new_column(&mut self, table: TableId) -> ColumnId {
        let id = ColumnId(self.alloc_id(IdKind::Column));
        let column = Column::random_new(id, &mut self.rng);
        self.table_mut(table).append_column(column);
        id
    }

    /// Allocate a new random column without attaching it anywhere.
    pub fn gen_column(&mut self) -> Column {
        let id = ColumnId(self.alloc_id(IdKind::Column));
        Column::random_new(id, &mut self.rng)
    }

    /// Generate (but do not append) a random index for the table; the caller
    /// may adjust it before [`Table::append_index`].
    pub fn gen_index(&mut self, table: TableId, allow_primary: bool) -> Index {
        let id = IndexId(self.alloc_id(IdKind::Index));
        let (table, rng) = self.table_and_rng(table);
        table.random_new_index(id, allow_primary, rng)
    }

    /// Clone a table's schema under fresh identifiers and register the clone
    /// as a child of the source.
    pub fn clone_table(&mut self, src: TableId) -> TableId {
        let new_id = TableId(self.alloc_id(IdKind::Table));
        let source = self.table(src).clone();
        let mut clone = Table::new(new_id);

        let mut col_map: Vec<(ColumnId, ColumnId)> = Vec::with_capacity(source.columns.len());
        for col in &source.columns {
            let cid = ColumnId(self.alloc_id(IdKind::Column));
            let mut cloned = col.clone();
            cloned.id = cid;
            cloned.name = format!("c{cid}");
            col_map.push((col.id, cid));
            clone.columns.push(cloned);
        }
        let remap = |old: ColumnId| -> ColumnId {
            col_map
                .iter()
                .find(|(from, _)| *from == old)
                .map(|(_, to)| *to)
                .expect("clone column map covers every source column")
        };
        for idx in &source.indices {
            let iid = IndexId(self.alloc_id(IdKind::Index));
            let mut cloned = idx.clone();
            cloned.id = iid;
            cloned.name = format!("i{iid}");
            for part in &mut cloned.columns {
                part.column = remap(part.column);
            }
            clone.indices.push(cloned);
        }
        clone.partition_columns = source.partition_columns.iter().map(|c| remap(*c)).collect();

        self.tables.push(clone);
        self.table_mut(src).child_tables.push(new_id);
        new_id
    }

    // ---- prepared statements --------------------------------------------

    pub fn prepares(&self) -> &[PreparedStatement] {
        &self.prepares
    }

    pub fn prepare(&self, id: PrepareId) -> &PreparedStatement {
        self.prepares
            .iter()
            .find(|p| p.id == id)
            .unwrap_or_else(|| panic!("unknown prepared statement p{id}"))
    }

    pub fn prepare_mut(&mut self, id: PrepareId) -> &mut PreparedStatement {
        self.prepares
            .iter_mut()
            .find(|p| p.id == id)
            .unwrap_or_else(|| panic!("unknown prepared statement p{id}"))
    }

    pub fn new_prepare(&mut self) -> PrepareId {
        let id = PrepareId(self.alloc_id(IdKind::Prepare));
        self.prepares.push(PreparedStatement::new(id));
        id
    }

    pub fn rand_prepare(&mut self) -> PrepareId {
        assert!(!self.prepares.is_empty(), "no prepared statements");
        let i = pick_index(self.prepares.len(), &mut self.rng);
        self.prepares[i].id
    }

    pub fn remove_prepare(&mut self, id: PrepareId) -> PreparedStatement {
        let pos = self
            .prepares
            .iter()
            .position(|p| p.id == id)
            .unwrap_or_else(|| panic!("unknown prepared statement p{id}"));
        self.prepares.remove(pos)
    }

    // ---- deferred SQL ---------------------------------------------------

    /// Queue a statement to be emitted verbatim ahead of any fresh grammar.
    pub fn push_deferred(&mut self, sql: impl Into<String>) {
        self.deferred.push_back(sql.into());
    }

    pub fn pop_deferred(&mut self) -> Option<String> {
        self.deferred.pop_front()
    }

    pub fn deferred(&self) -> &VecDeque<String> {
        &self.deferred
    }

    // ---- scope ----------------------------------------------------------

    pub fn scope(&self) -> &ScopeStack {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut ScopeStack {
        &mut self.scope
    }

    pub fn search(&self, key: ScopeKey) -> Option<&ScopeObj> {
        self.scope.search(key)
    }

    pub fn store(&mut self, key: ScopeKey, obj: ScopeObj) {
        self.scope.store(key, obj);
    }

    pub fn store_in_parent(&mut self, key: ScopeKey, obj: ScopeObj) {
        self.scope.store_in_parent(key, obj);
    }

    pub fn store_in_root(&mut self, key: ScopeKey, obj: ScopeObj) {
        self.scope.store_in_root(key, obj);
    }

    // ---- session toggles ------------------------------------------------

    pub fn clustered_enabled(&self) -> bool {
        self.clustered_enabled
    }

    pub fn set_clustered_enabled(&mut self, on: bool) {
        self.clustered_enabled = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_allocators_are_independent_and_monotonic() {
        let mut state = State::new(0, Profile::default());
        assert_eq!(state.alloc_id(IdKind::Table), 0);
        assert_eq!(state.alloc_id(IdKind::Table), 1);
        assert_eq!(state.alloc_id(IdKind::Column), 0);
        assert_eq!(state.alloc_id(IdKind::Index), 0);
        assert_eq!(state.alloc_id(IdKind::Table), 2);
    }

    #[test]
    fn new_table_names_follow_ids() {
        let mut state = State::new(0, Profile::default());
        let a = state.new_table();
        let b = state.new_table();
        assert_eq!(state.table(a).name, "t0");
        assert_eq!(state.table(b).name, "t1");
    }

    #[test]
    fn clone_table_uses_fresh_ids_and_registers_child() {
        let mut state = State::new(1, Profile::default());
        let src = state.new_table();
        state.new_column(src);
        state.new_column(src);
        let idx = state.gen_index(src, true);
        state.table_mut(src).append_index(idx);

        let clone = state.clone_table(src);
        let (s, c) = (state.table(src), state.table(clone));
        assert_eq!(s.columns.len(), c.columns.len());
        assert_eq!(s.indices.len(), c.indices.len());
        assert_ne!(s.columns[0].id, c.columns[0].id);
        assert!(s.child_tables.contains(&clone));
        assert!(c.values.is_empty());
        for (si, ci) in s.indices.iter().zip(&c.indices) {
            assert_ne!(si.id, ci.id);
            assert_eq!(si.kind, ci.kind);
            assert_eq!(si.columns.len(), ci.columns.len());
        }
    }

    #[test]
    fn remove_table_scrubs_child_references() {
        let mut state = State::new(2, Profile::default());
        let src = state.new_table();
        state.new_column(src);
        let clone = state.clone_table(src);
        state.remove_table(clone);
        assert!(state.table(src).child_tables.is_empty());
    }

    #[test]
    #[should_panic(expected = "initialized twice")]
    fn initialization_flips_only_once() {
        let mut state = State::new(3, Profile::default());
        state.set_initialized();
        state.set_initialized();
    }

    #[test]
    fn deferred_queue_is_fifo() {
        let mut state = State::new(4, Profile::default());
        state.push_deferred("a");
        state.push_deferred("b");
        assert_eq!(state.pop_deferred().as_deref(), Some("a"));
        assert_eq!(state.pop_deferred().as_deref(), Some("b"));
        assert_eq!(state.pop_deferred(), None);
    }
}
