//! Hierarchical, typed scope store threading context between nested
//! productions.
//!
//! Every named production evaluates under its own frame; lookups walk from
//! the innermost frame outward. The outermost (root) frame outlives single
//! generation calls, which is how `select into outfile` leaves a breadcrumb
//! for a later `load data`.

use std::collections::HashMap;

use crate::model::{ColumnId, PrepareId, TableId};

/// Closed key set; adding a key is a source change, so typos cannot creep in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    CurrentTable,
    CurrentMultiTable,
    CurrentPrepare,
    CurrentPartitionColumn,
    LastOutFileTable,
    LastOutFileId,
    LastDropTable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeObj {
    Table(TableId),
    Tables(Vec<TableId>),
    Prepare(PrepareId),
    Column(ColumnId),
    Int(u64),
}

impl ScopeObj {
    pub fn as_table(&self) -> TableId {
        match self {
            ScopeObj::Table(id) => *id,
            other => panic!("scope object is not a table: {other:?}"),
        }
    }

    pub fn as_tables(&self) -> &[TableId] {
        match self {
            ScopeObj::Tables(ids) => ids,
            other => panic!("scope object is not a table list: {other:?}"),
        }
    }

    pub fn as_prepare(&self) -> PrepareId {
        match self {
            ScopeObj::Prepare(id) => *id,
            other => panic!("scope object is not a prepared statement: {other:?}"),
        }
    }

    pub fn as_column(&self) -> ColumnId {
        match self {
            ScopeObj::Column(id) => *id,
            other => panic!("scope object is not a column: {other:?}"),
        }
    }

    pub fn as_int(&self) -> u64 {
        match self {
            ScopeObj::Int(v) => *v,
            other => panic!("scope object is not an int: {other:?}"),
        }
    }
}

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<HashMap<ScopeKey, ScopeObj>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        // The root frame persists for the generator's lifetime.
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        assert!(self.frames.len() > 1, "cannot pop the root frame");
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Innermost-to-outermost lookup; `None` when no frame holds the key.
    pub fn search(&self, key: ScopeKey) -> Option<&ScopeObj> {
        self.frames.iter().rev().find_map(|f| f.get(&key))
    }

    /// Write into the current frame.
    pub fn store(&mut self, key: ScopeKey, obj: ScopeObj) {
        self.frames
            .last_mut()
            .expect("scope stack always has a root frame")
            .insert(key, obj);
    }

    /// Write into the caller's frame. Falls back to the root frame when the
    /// current frame is the root.
    pub fn store_in_parent(&mut self, key: ScopeKey, obj: ScopeObj) {
        let at = self.frames.len().saturating_sub(2);
        self.frames[at].insert(key, obj);
    }

    /// Write into the outermost frame, surviving frame pops and generation
    /// call boundaries.
    pub fn store_in_root(&mut self, key: ScopeKey, obj: ScopeObj) {
        self.frames[0].insert(key, obj);
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
