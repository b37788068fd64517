//! The concrete production library.
//!
//! `start` is the grammar entry point: it drains the deferred-SQL queue,
//! drives catalog initialization, and then hands off to the weighted
//! statement families. Each production reads and mutates the catalog as it
//! emits, so every statement is well-formed against the schema the previous
//! statements built.

pub mod admin;
pub mod ddl;
pub mod dml;
pub mod prepare;
pub mod query;

use itertools::Itertools;

use crate::grammar::{alt, lazy, lit, when, Prod};
use crate::model::{ColumnId, Table, TableId};
use crate::rng::random_bool;
use crate::scope::ScopeKey;
use crate::state::State;

/// Grammar entry: one evaluation, one complete SQL statement.
pub fn start() -> Prod {
    lazy(|state| {
        if let Some(sql) = state.pop_deferred() {
            return lit(sql);
        }
        if !state.initialized() {
            let out = init_start().eval(state);
            if state.meets_init_demand() {
                state.set_initialized();
            }
            return lit(out);
        }
        let w = state.profile().clone();
        alt(vec![
            admin::switch_row_format().set_w(w.set_row_format),
            admin::switch_clustered().set_w(w.set_clustered),
            admin::admin_check().set_w(w.admin_check),
            when(
                state.tables().len() < w.max_table_num,
                alt(vec![
                    ddl::create_table().set_w(w.create_table_without_like),
                    ddl::create_table_like(),
                ]),
            )
            .set_w(w.create_table),
            when(
                !state.tables().is_empty(),
                alt(vec![
                    dml::dml_stmt().set_w(w.query_dml),
                    ddl::ddl_stmt().set_w(w.query_ddl),
                    admin::split_region().set_w(w.query_split),
                    admin::analyze_table().set_w(w.query_analyze),
                    prepare::prepare_stmt().set_w(w.query_prepare),
                    when(!state.prepares().is_empty(), prepare::dealloc_prepare_stmt()),
                    when(w.can_read_gc_save_point, admin::flashback_table()),
                    when(
                        w.enable_select_outfile_and_load_data,
                        alt(vec![
                            admin::select_into_outfile(),
                            when(
                                state.search(ScopeKey::LastOutFileTable).is_some(),
                                admin::load_table(),
                            ),
                        ]),
                    ),
                ]),
            )
            .set_w(w.query),
        ])
    })
}

/// Bootstrap dispatcher: tables first, then one insert per table until each
/// meets its row quota.
fn init_start() -> Prod {
    lazy(|state| {
        assert!(!state.initialized(), "init_start re-entered after bootstrap");
        if state.tables().len() < state.profile().init_table_count {
            ddl::create_table()
        } else {
            dml::insert_into()
        }
    })
}

/// The table predicates apply to: a random side of the current join when a
/// multi-table query is in scope, the current table otherwise.
pub(crate) fn predicate_table(state: &mut State) -> TableId {
    let multi = state
        .search(ScopeKey::CurrentMultiTable)
        .map(|o| o.as_tables().to_vec());
    match multi {
        Some(ids) => {
            if random_bool(state.rng_mut()) {
                ids[0]
            } else {
                ids[1]
            }
        }
        None => state
            .search(ScopeKey::CurrentTable)
            .expect("no table in scope for predicate generation")
            .as_table(),
    }
}

/// `c1, c2, …`, falling back to `default` when the list is empty.
pub(crate) fn print_column_names(table: &Table, cols: &[ColumnId], default: &str) -> String {
    if cols.is_empty() {
        return default.to_string();
    }
    cols.iter().map(|c| &table.column(*c).name).join(", ")
}

/// `( c1, c2, … )`, or nothing when the list is empty.
pub(crate) fn print_column_names_with_par(table: &Table, cols: &[ColumnId]) -> String {
    if cols.is_empty() {
        return String::new();
    }
    format!("( {} )", print_column_names(table, cols, ""))
}

/// `t.c1, t.c2, …`, falling back to `t.*`.
pub(crate) fn print_qualified_column_names(table: &Table, cols: &[ColumnId]) -> String {
    if cols.is_empty() {
        return format!("{}.*", table.name);
    }
    cols.iter()
        .map(|c| format!("{}.{}", table.name, table.column(*c).name))
        .join(", ")
}

/// `v1 , v2 , …` for a tuple body.
pub(crate) fn print_values(vals: &[String]) -> String {
    vals.join(" , ")
}

/// Key-part list with prefix lengths: `c1(3), c2`.
pub(crate) fn print_index_columns(table: &Table, index: &crate::model::Index) -> String {
    index
        .columns
        .iter()
        .map(|ic| {
            let name = &table.column(ic.column).name;
            match ic.prefix {
                Some(p) => format!("{name}({p})"),
                None => name.clone(),
            }
        })
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnType, Index, IndexColumn, IndexId, IndexKind};
    use crate::profile::Profile;
    use crate::scope::ScopeObj;

    fn sample_table() -> Table {
        let mut t = Table::new(TableId(0));
        for i in 0..3u64 {
            t.append_column(Column {
                id: ColumnId(i),
                name: format!("c{i}"),
                tp: if i == 2 { ColumnType::Varchar } else { ColumnType::Int },
                len: 10,
                scale: 0,
                nullable: true,
                default_value: None,
                is_partition_key: false,
                members: Vec::new(),
            });
        }
        t
    }

    #[test]
    fn column_name_printing() {
        let t = sample_table();
        assert_eq!(
            print_column_names(&t, &[ColumnId(0), ColumnId(2)], "*"),
            "c0, c2"
        );
        assert_eq!(print_column_names(&t, &[], "*"), "*");
        assert_eq!(
            print_column_names_with_par(&t, &[ColumnId(1)]),
            "( c1 )"
        );
        assert_eq!(print_column_names_with_par(&t, &[]), "");
        assert_eq!(
            print_qualified_column_names(&t, &[ColumnId(0)]),
            "t0.c0"
        );
        assert_eq!(print_qualified_column_names(&t, &[]), "t0.*");
    }

    #[test]
    fn index_columns_render_prefix_lengths() {
        let t = sample_table();
        let idx = Index::new(
            IndexId(0),
            IndexKind::NonUnique,
            vec![
                IndexColumn {
                    column: ColumnId(2),
                    prefix: Some(3),
                },
                IndexColumn {
                    column: ColumnId(0),
                    prefix: None,
                },
            ],
        );
        assert_eq!(print_index_columns(&t, &idx), "c2(3), c0");
    }

    #[test]
    fn predicate_table_prefers_multi_table_scope() {
        let mut state = State::new(9, Profile::default());
        let a = state.new_table();
        let b = state.new_table();
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(a));
        assert_eq!(predicate_table(&mut state), a);
        state.store(ScopeKey::CurrentMultiTable, ScopeObj::Tables(vec![a, b]));
        let picked = predicate_table(&mut state);
        assert!(picked == a || picked == b);
    }
}
