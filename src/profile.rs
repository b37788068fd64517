//! Weight profile and feature toggles steering statement selection.
//!
//! Each weight is the relative probability of its branch inside the grammar;
//! zero disables the branch entirely. Feature flags gate whole statement
//! families, and the `init_*` parameters drive catalog bootstrap.

use serde::{Deserialize, Serialize};

/// Pin for the `partition by` clause kind on `create table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionPin {
    /// Let the generator pick hash/range/list/none at random.
    #[default]
    Random,
    Hash,
    Range,
    List,
}

/// Aggregate execution hint injected into aggregate selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggHint {
    #[default]
    None,
    HashAgg,
    StreamAgg,
}

impl AggHint {
    pub fn hint_text(self) -> Option<&'static str> {
        match self {
            AggHint::None => None,
            AggHint::HashAgg => Some("hash_agg()"),
            AggHint::StreamAgg => Some("stream_agg()"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    // Top-level statement weights.
    pub set_row_format: u32,
    pub set_clustered: u32,
    pub admin_check: u32,
    pub create_table: u32,
    pub create_table_without_like: u32,
    pub query: u32,

    // create table shape.
    pub create_table_max_column_cnt: usize,
    pub create_table_index_more_col: usize,
    pub create_table_with_cluster_hint: bool,
    pub create_table_partition_type: PartitionPin,

    // Query branch weights.
    pub query_dml: u32,
    pub query_ddl: u32,
    pub query_split: u32,
    pub query_analyze: u32,
    pub query_prepare: u32,

    // DML weights.
    pub query_select: u32,
    pub query_dml_del: u32,
    pub query_dml_del_common: u32,
    pub query_dml_del_index: u32,
    pub query_dml_del_index_common: u32,
    pub query_dml_insert: u32,
    pub query_dml_insert_on_dup: u32,
    pub query_dml_update: u32,
    pub query_dml_can_be_replace: bool,

    // Select shape.
    pub query_has_orderby: u32,
    pub query_has_limit: u32,
    pub query_union: u32,
    pub query_window: u32,
    pub query_index_merge: bool,

    // Feature toggles.
    pub enable_test_tiflash: bool,
    pub enable_column_type_change: bool,
    pub enable_select_outfile_and_load_data: bool,
    pub can_read_gc_save_point: bool,
    pub strict_trans_table: bool,
    pub enable_agg_push_down: bool,
    pub agg_type: AggHint,

    // Initialization parameters.
    pub init_table_count: usize,
    pub init_col_count: usize,
    pub init_row_count: usize,
    pub max_table_num: usize,
    pub select_out_file_dir: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            set_row_format: 1,
            set_clustered: 1,
            admin_check: 1,
            create_table: 2,
            create_table_without_like: 4,
            query: 30,

            create_table_max_column_cnt: 10,
            create_table_index_more_col: 4,
            create_table_with_cluster_hint: false,
            create_table_partition_type: PartitionPin::Random,

            query_dml: 20,
            query_ddl: 5,
            query_split: 2,
            query_analyze: 1,
            query_prepare: 2,

            query_select: 15,
            query_dml_del: 5,
            query_dml_del_common: 3,
            query_dml_del_index: 1,
            query_dml_del_index_common: 1,
            query_dml_insert: 10,
            query_dml_insert_on_dup: 2,
            query_dml_update: 10,
            query_dml_can_be_replace: true,

            query_has_orderby: 1,
            query_has_limit: 1,
            query_union: 3,
            query_window: 2,
            query_index_merge: false,

            enable_test_tiflash: false,
            enable_column_type_change: true,
            enable_select_outfile_and_load_data: false,
            can_read_gc_save_point: false,
            strict_trans_table: true,
            enable_agg_push_down: false,
            agg_type: AggHint::None,

            init_table_count: 5,
            init_col_count: 5,
            init_row_count: 1,
            max_table_num: 20,
            select_out_file_dir: "/tmp/sqlsurge".to_string(),
        }
    }
}

impl Profile {
    /// Every weight zero and every toggle off; the baseline for tests that
    /// force exactly one branch.
    pub fn none() -> Self {
        Self {
            set_row_format: 0,
            set_clustered: 0,
            admin_check: 0,
            create_table: 0,
            create_table_without_like: 0,
            query: 0,
            query_dml: 0,
            query_ddl: 0,
            query_split: 0,
            query_analyze: 0,
            query_prepare: 0,
            query_select: 0,
            query_dml_del: 0,
            query_dml_insert: 0,
            query_dml_insert_on_dup: 0,
            query_dml_update: 0,
            query_dml_can_be_replace: false,
            query_has_orderby: 0,
            query_has_limit: 0,
            query_union: 0,
            query_window: 0,
            enable_column_type_change: false,
            strict_trans_table: false,
            ..Self::default()
        }
    }

    pub fn with_seedless_init(mut self, tables: usize, cols: usize) -> Self {
        self.init_table_count = tables;
        self.init_col_count = cols;
        self
    }

    pub fn with_query(mut self, weight: u32) -> Self {
        self.query = weight;
        self
    }

    pub fn with_select_only(mut self) -> Self {
        self.query = 1;
        self.query_dml = 1;
        self.query_select = 1;
        self
    }

    pub fn with_index_merge(mut self, on: bool) -> Self {
        self.query_index_merge = on;
        self
    }

    pub fn with_max_table_num(mut self, n: usize) -> Self {
        self.max_table_num = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_enables_queries() {
        let p = Profile::default();
        assert!(p.query > 0);
        assert!(p.query_dml > 0);
        assert!(p.init_table_count > 0);
        assert_eq!(p.init_row_count, 1);
    }

    #[test]
    fn none_profile_disables_statement_weights() {
        let p = Profile::none();
        assert_eq!(p.query, 0);
        assert_eq!(p.create_table, 0);
        assert_eq!(p.set_row_format, 0);
        // Init parameters stay usable so bootstrap still works.
        assert!(p.init_table_count > 0);
    }

    #[test]
    fn builders_compose() {
        let p = Profile::none().with_select_only().with_max_table_num(1);
        assert_eq!(p.query, 1);
        assert_eq!(p.query_select, 1);
        assert_eq!(p.max_table_num, 1);
        assert_eq!(p.query_ddl, 0);
    }
}
