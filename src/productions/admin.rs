//! Session switches, admin checks, region splits, flashback, and the
//! outfile/load pair.

use crate::grammar::{alt, lazy, lit, lits, Prod};
use crate::model::IdKind;
use crate::productions::print_values;
use crate::rng::{pick, random_bool, random_int, random_num};
use crate::scope::{ScopeKey, ScopeObj};

pub fn switch_row_format() -> Prod {
    lazy(|state| {
        if random_bool(state.rng_mut()) {
            lit("set @@global.tidb_row_format_version = 2")
        } else {
            lit("set @@global.tidb_row_format_version = 1")
        }
    })
}

pub fn switch_clustered() -> Prod {
    lazy(|state| {
        if random_bool(state.rng_mut()) {
            state.set_clustered_enabled(false);
            lit("set @@global.tidb_enable_clustered_index = 0")
        } else {
            state.set_clustered_enabled(true);
            lit("set @@global.tidb_enable_clustered_index = 1")
        }
    })
}

/// `admin check table` / `admin check index`. With TiFlash testing on this
/// emits the empty string; the driver filters empty statements rather than
/// executing them.
pub fn admin_check() -> Prod {
    lazy(|state| {
        if state.profile().enable_test_tiflash {
            return lit("");
        }
        let tid = state.rand_table();
        let (table, rng) = state.table_and_rng(tid);
        let table_name = table.name.clone();
        match table.rand_index(rng) {
            None => lits(["admin check table", table_name.as_str()]),
            Some(index) => {
                let index_name = index.name.clone();
                alt(vec![
                    lits(["admin check table", table_name.as_str()]),
                    lits([
                        "admin check index",
                        table_name.as_str(),
                        index_name.as_str(),
                    ]),
                ])
            }
        }
    })
}

pub fn analyze_table() -> Prod {
    lazy(|state| {
        let tid = state.rand_table();
        lits(["analyze table", state.table(tid).name.as_str()])
    })
}

/// Drop or truncate a table and queue the matching `flashback table` so it
/// is the very next emitted statement.
pub fn flashback_table() -> Prod {
    lazy(|state| {
        let tid = state.rand_table();
        let name = state.table(tid).name.clone();
        state.store_in_root(ScopeKey::LastDropTable, ScopeObj::Table(tid));
        state.push_deferred(format!("flashback table {name}"));
        alt(vec![
            lits(["drop table", name.as_str()]),
            lits(["truncate table", name.as_str()]),
        ])
    })
}

/// `split table … between/by …`, optionally against one of its indexes.
/// Row tuples are ascending so the region boundaries are well ordered.
pub fn split_region() -> Prod {
    lazy(|state| {
        let tid = state.rand_table();
        let (table, rng) = state.table_and_rng(tid);
        let table_name = table.name.clone();
        let index = if !table.indices.is_empty() && random_bool(rng) {
            table.rand_index(rng).map(|i| i.id)
        } else {
            None
        };
        match index {
            Some(iid) => {
                let index_name = table.index(iid).name.clone();
                if random_bool(rng) {
                    let rows = table.gen_rows_asc_for_index(iid, 2, rng);
                    lit(format!(
                        "split table {table_name} index {index_name} between ( {} ) and ( {} ) regions {}",
                        print_values(&rows[0]),
                        print_values(&rows[1]),
                        random_num(rng, 2, 10)
                    ))
                } else {
                    let n = random_int(rng, 2, 11) as usize;
                    let rows = table.gen_rows_asc_for_index(iid, n, rng);
                    lit(format!(
                        "split table {table_name} index {index_name} by {}",
                        print_split_by_items(&rows)
                    ))
                }
            }
            None => {
                if random_bool(rng) {
                    let rows = table.gen_rows_asc_for_handle(2, rng);
                    lit(format!(
                        "split table {table_name} between ( {} ) and ( {} ) regions {}",
                        print_values(&rows[0]),
                        print_values(&rows[1]),
                        random_num(rng, 2, 10)
                    ))
                } else {
                    let n = random_int(rng, 2, 11) as usize;
                    let rows = table.gen_rows_asc_for_handle(n, rng);
                    lit(format!(
                        "split table {table_name} by {}",
                        print_split_by_items(&rows)
                    ))
                }
            }
        }
    })
}

fn print_split_by_items(rows: &[Vec<String>]) -> String {
    let items = rows
        .iter()
        .map(|row| format!("( {} )", print_values(row)))
        .collect::<Vec<_>>()
        .join(" , ");
    format!("( {items} )")
}

/// Dump a random table to a fresh file under the configured directory and
/// leave a breadcrumb in the root scope for a later `load data`.
pub fn select_into_outfile() -> Prod {
    lazy(|state| {
        let tid = state.rand_table();
        let file_id = state.alloc_id(IdKind::TmpFile);
        state.store_in_root(ScopeKey::LastOutFileTable, ScopeObj::Table(tid));
        state.store_in_root(ScopeKey::LastOutFileId, ScopeObj::Int(file_id));
        let dir = state.profile().select_out_file_dir.clone();
        let name = state.table(tid).name.clone();
        lit(format!(
            "select * from {name} into outfile '{dir}/{name}_{file_id}.txt'"
        ))
    })
}

/// Load the last outfile into one of the source table's clones (or back
/// into the source when it has no clones yet).
pub fn load_table() -> Prod {
    lazy(|state| {
        let tid = state
            .search(ScopeKey::LastOutFileTable)
            .expect("load_table gated on a prior outfile")
            .as_table();
        let file_id = state
            .search(ScopeKey::LastOutFileId)
            .expect("outfile id stored with the table")
            .as_int();
        let dir = state.profile().select_out_file_dir.clone();
        let (src_name, children) = {
            let table = state.table(tid);
            (table.name.clone(), table.child_tables.clone())
        };
        let target = if children.is_empty() {
            tid
        } else {
            *pick(&children, state.rng_mut())
        };
        let target_name = state.table(target).name.clone();
        lit(format!(
            "load data local infile '{dir}/{src_name}_{file_id}.txt' into table {target_name}"
        ))
    })
}
