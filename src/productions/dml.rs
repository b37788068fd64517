//! DML productions: initialization inserts, general insert/replace, update,
//! delete.

use crate::grammar::{alt, lazy, lit, lits, nothing, opt_when, repeat_range, seq, when, Prod};
use crate::model::ColumnId;
use crate::productions::{prepare, print_column_names, print_column_names_with_par, print_values, query};
use crate::rng::{frequency, random_int};
use crate::scope::{ScopeKey, ScopeObj};
use crate::state::State;

pub fn dml_stmt() -> Prod {
    lazy(|state| {
        assert!(!state.tables().is_empty(), "DML requires at least one table");
        let w = state.profile().clone();
        alt(vec![
            query::query().set_w(w.query_select),
            when(!state.prepares().is_empty(), prepare::query_prepare()),
            common_delete().set_w(w.query_dml_del),
            common_insert().set_w(w.query_dml_insert),
            common_update().set_w(w.query_dml_update),
        ])
    })
}

/// Initialization-only: one row into the first table still short of its
/// quota, sampled into the catalog's row buffer for later predicate bias.
pub(crate) fn insert_into() -> Prod {
    lazy(|state| {
        assert!(
            !state.initialized(),
            "insert_into must not run after initialization"
        );
        let tid = state
            .first_non_full_table()
            .expect("initialization keeps a non-full table around");
        let (table, rng) = state.table_and_rng(tid);
        let cols: Vec<ColumnId> = table.columns.iter().map(|c| c.id).collect();
        let vals = table.gen_rand_values(&cols, rng);
        table.append_row(vals.clone());
        let body = print_values(&vals);
        lits([
            "insert into",
            table.name.as_str(),
            "values",
            "(",
            body.as_str(),
            ")",
        ])
    })
}

fn common_insert() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let tid = state.rand_table();
        let (table, rng) = state.table_and_rng(tid);
        let cols = if w.strict_trans_table {
            table.rand_columns_with_defaults(rng)
        } else {
            table.rand_columns(rng)
        };
        let replace = w.query_dml_can_be_replace && random_int(rng, 0, 2) == 0;
        let verb = if replace { "replace" } else { "insert" };
        let table_name = table.name.clone();
        let col_list = print_column_names_with_par(table, &cols);

        let on_duplicate_update = lazy(move |state: &mut State| {
            let w = state.profile().clone();
            let (table, rng) = state.table_and_rng(tid);
            let cols = table.rand_columns_non_empty(rng);
            let assignments = cols
                .iter()
                .map(|c| {
                    let col = table.column(*c);
                    format!("{} = {}", col.name, col.random_value(rng))
                })
                .collect::<Vec<_>>()
                .join(" , ");
            alt(vec![
                nothing().set_w(3),
                lits(["on duplicate key update", assignments.as_str()])
                    .set_w(w.query_dml_insert_on_dup),
            ])
        });

        let row_cols = cols.clone();
        let row_val = lazy(move |state: &mut State| {
            let (table, rng) = state.table_and_rng(tid);
            let vals = table.gen_rand_values(&row_cols, rng);
            let body = print_values(&vals);
            lits(["(", body.as_str(), ")"])
        });
        let multiple_row_vals = repeat_range(1, 7, row_val, lit(","));

        let insert_set_item = lazy(move |state: &mut State| {
            let (table, rng) = state.table_and_rng(tid);
            let col = table.rand_column(rng);
            lit(format!("{} = {}", col.name, col.random_value(rng)))
        });

        alt(vec![
            seq(vec![
                lit(verb),
                opt_when(!replace, lit("ignore")),
                lit("into"),
                lit(table_name.clone()),
                lit(col_list),
                lit("values"),
                multiple_row_vals,
                opt_when(!replace, on_duplicate_update.clone()),
            ]),
            seq(vec![
                lit(verb),
                opt_when(!replace, lit("ignore")),
                lit("into"),
                lit(table_name),
                lit("set"),
                repeat_range(1, 3, insert_set_item, lit(",")),
                opt_when(!replace, on_duplicate_update),
            ]),
        ])
    })
}

fn common_update() -> Prod {
    lazy(|state| {
        let tid = state.rand_table();
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(tid));
        let (table, rng) = state.table_and_rng(tid);
        let order_by_cols = table.rand_columns(rng);
        let table_name = table.name.clone();
        let order_list = print_column_names(table, &order_by_cols, "");

        let assignment = lazy(move |state: &mut State| {
            let (table, rng) = state.table_and_rng(tid);
            let col = table.rand_column(rng);
            lit(format!("{} = {}", col.name, col.random_value(rng)))
        });

        seq(vec![
            lit("update"),
            lit(table_name),
            lit("set"),
            repeat_range(1, 3, assignment, lit(",")),
            lit("where"),
            query::predicates(),
            opt_when(
                !order_by_cols.is_empty(),
                seq(vec![lit("order by"), lit(order_list), maybe_limit()]),
            ),
        ])
    })
}

fn common_delete() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let tid = state.rand_table();
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(tid));
        let (table, rng) = state.table_and_rng(tid);
        let cid = match frequency(&[w.query_dml_del_common, w.query_dml_del_index], rng) {
            Some(1) => table.rand_index_first_column_weighted(
                w.query_dml_del_index_common,
                w.query_dml_del_index_common,
                rng,
            ),
            _ => table.rand_column(rng).id,
        };
        let table_name = table.name.clone();
        let col_name = table.column(cid).name.clone();

        let rand_row_val = lazy(move |state: &mut State| {
            let (table, rng) = state.table_and_rng(tid);
            lit(table.column(cid).random_value(rng))
        });
        let multiple_row_vals = repeat_range(1, 9, rand_row_val, lit(","));

        seq(vec![
            lit("delete from"),
            lit(table_name),
            lit("where"),
            alt(vec![
                seq(vec![query::predicates(), maybe_limit()]),
                seq(vec![
                    lit(col_name.clone()),
                    lit("in"),
                    lit("("),
                    multiple_row_vals,
                    lit(")"),
                    maybe_limit(),
                ]),
                seq(vec![lit(col_name), lit("is null"), maybe_limit()]),
            ]),
        ])
    })
}

/// Deliberately empty: a trailing limit makes ordered update/delete results
/// diverge between clustered and non-clustered layouts.
fn maybe_limit() -> Prod {
    nothing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::productions::start;
    use crate::profile::Profile;

    fn bootstrapped(seed: u64) -> State {
        let mut state = State::new(seed, Profile::default());
        while !state.initialized() {
            start().eval(&mut state);
        }
        state
    }

    #[test]
    fn insert_into_samples_rows_during_init() {
        let mut state = State::new(5, Profile::default());
        // Create the init tables first.
        while state.tables().len() < state.profile().init_table_count {
            start().eval(&mut state);
        }
        let before: usize = state.tables().iter().map(|t| t.values.len()).sum();
        let sql = insert_into().eval(&mut state);
        assert!(sql.starts_with("insert into t"), "got {sql:?}");
        let after: usize = state.tables().iter().map(|t| t.values.len()).sum();
        assert_eq!(after, before + 1);
    }

    #[test]
    #[should_panic(expected = "must not run after initialization")]
    fn insert_into_rejects_initialized_catalog() {
        let mut state = bootstrapped(6);
        insert_into().eval(&mut state);
    }

    #[test]
    fn dml_statements_have_known_shapes() {
        let mut state = bootstrapped(8);
        for _ in 0..200 {
            let sql = dml_stmt().eval(&mut state);
            assert!(
                sql.starts_with("select")
                    || sql.starts_with("(")
                    || sql.starts_with("insert")
                    || sql.starts_with("replace")
                    || sql.starts_with("update")
                    || sql.starts_with("delete from"),
                "unexpected DML shape: {sql:?}"
            );
        }
    }

    #[test]
    fn delete_never_appends_limit() {
        let mut state = bootstrapped(10);
        for _ in 0..100 {
            let sql = common_delete().eval(&mut state);
            assert!(!sql.contains("limit"), "got {sql:?}");
        }
    }
}
