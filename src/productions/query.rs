//! Query productions: the six select shapes, the predicate grammar, and the
//! multi-table joins. Aggregate shapes wrap their filter in a subquery with
//! a deterministic order so result digests stay comparable across engines.

use itertools::Itertools;

use crate::grammar::{alt, lazy, lit, lits, nothing, opt, opt_when, repeat, repeat_range, seq, when, Prod};
use crate::model::{Column, ColumnId, Table};
use crate::productions::{predicate_table, print_column_names, print_qualified_column_names, print_values};
use crate::profile::AggHint;
use crate::rng::{pick, random_bool, random_int, random_num};
use crate::scope::{ScopeKey, ScopeObj};
use crate::state::State;
use rand_chacha::ChaCha8Rng;

fn limit_clause() -> Prod {
    lazy(|state| lit(format!("limit {}", random_num(state.rng_mut(), 1, 1000))))
}

fn all_column_ids(table: &Table) -> Vec<ColumnId> {
    table.columns.iter().map(|c| c.id).collect()
}

pub fn query() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let tid = state.rand_table();
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(tid));
        let cols = {
            let (table, rng) = state.table_and_rng(tid);
            table.rand_columns(rng)
        };
        let cols_list = print_column_names(state.table(tid), &cols, "");

        let common_select = {
            let cols = cols.clone();
            lazy(move |state: &mut State| {
                let w = state.profile().clone();
                let prepare = state
                    .search(ScopeKey::CurrentPrepare)
                    .map(|o| o.as_prepare());
                let mut captured: Vec<Column> = Vec::new();
                let projection = {
                    let (table, rng) = state.table_and_rng(tid);
                    if cols.is_empty() {
                        "*".to_string()
                    } else {
                        cols.iter()
                            .map(|c| {
                                let col = table.column(*c);
                                // A live prepare occasionally swaps a
                                // projected column for a placeholder.
                                if prepare.is_some() && random_int(rng, 0, 9) == 0 {
                                    captured.push(col.clone());
                                    "?".to_string()
                                } else {
                                    col.name.clone()
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    }
                };
                if let Some(pid) = prepare {
                    for col in captured {
                        state.prepare_mut(pid).append_param(col);
                    }
                }
                let table = state.table(tid);
                let table_name = table.name.clone();
                let order_cols = print_column_names(table, &all_column_ids(table), "");
                seq(vec![
                    lit("select"),
                    opt_when(
                        w.enable_test_tiflash,
                        lit(format!("/*+ read_from_storage(tiflash[{table_name}]) */")),
                    ),
                    opt_when(
                        w.query_index_merge,
                        lit(format!("/*+ use_index_merge({table_name}) */")),
                    ),
                    lit(projection),
                    lit("from"),
                    lit(table_name),
                    lit("where"),
                    predicates(),
                    opt_when(
                        w.query_has_orderby > 0,
                        lits(["order by", order_cols.as_str()]),
                    ),
                    opt_when(w.query_has_limit > 0, limit_clause()),
                ])
            })
        };

        let for_update = opt(lit("for update"));
        let union_op = alt(vec![
            lit("union"),
            lit("union all"),
            lit("except"),
            lit("intersect"),
        ]);

        let agg_select = lazy(move |state: &mut State| {
            let w = state.profile().clone();
            let push_down = random_bool(state.rng_mut());
            state.profile_mut().enable_agg_push_down = push_down;
            let hints = [AggHint::None, AggHint::HashAgg, AggHint::StreamAgg];
            let agg_hint = *pick(&hints, state.rng_mut());
            state.profile_mut().agg_type = agg_hint;

            let (table, rng) = state.table_and_rng(tid);
            let mut agg_cols: Vec<ColumnId> = Vec::with_capacity(5);
            for _ in 0..5 {
                agg_cols.push(table.rand_column(rng).id);
            }
            let group_by = table.rand_columns(rng);
            let agg_func = random_agg_func(table, &agg_cols, rng);
            let order_handle = match table.primary_key_index() {
                Some(pk) => {
                    let pk_cols: Vec<ColumnId> =
                        pk.columns.iter().map(|ic| ic.column).collect();
                    print_column_names(table, &pk_cols, "")
                }
                None => "_tidb_rowid".to_string(),
            };
            let table_name = table.name.clone();
            let group_list = print_column_names(table, &group_by, "");

            seq(vec![
                lit("select"),
                lit("/*+"),
                opt_when(push_down, lit("agg_to_cop()")),
                match agg_hint.hint_text() {
                    Some(h) => opt(lit(h)),
                    None => nothing(),
                },
                lit("*/"),
                lit(agg_func),
                lit("from"),
                lit("(select"),
                opt_when(
                    w.enable_test_tiflash,
                    lit(format!("/*+ read_from_storage(tiflash[{table_name}]) */")),
                ),
                opt_when(
                    w.query_index_merge,
                    lit(format!("/*+ use_index_merge({table_name}) */")),
                ),
                lit("*"),
                lit("from"),
                lit(table_name),
                lit("where"),
                predicates(),
                lit("order by"),
                lit(order_handle),
                lit(") ordered_tbl"),
                when(
                    !group_by.is_empty(),
                    lits(["group by", group_list.as_str()]),
                ),
                opt_when(w.query_has_orderby > 0, lit("order by aggCol")),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ])
        });

        let window_select = lazy(move |state: &mut State| {
            let w = state.profile().clone();
            let (table, rng) = state.table_and_rng(tid);
            let window_func = random_window_func(rng);
            let window_spec = random_window_spec(table, rng);
            let table_name = table.name.clone();
            let order_cols = print_column_names(table, &all_column_ids(table), "");
            seq(vec![
                lit("select"),
                opt_when(
                    w.enable_test_tiflash,
                    lit(format!("/*+ read_from_storage(tiflash[{table_name}]) */")),
                ),
                opt_when(
                    w.query_index_merge,
                    lit(format!("/*+ use_index_merge({table_name}) */")),
                ),
                lit(window_func.clone()),
                lit("over w"),
                lit("from"),
                lit(table_name),
                lit("window w as"),
                lit(window_spec),
                opt_when(
                    w.query_has_orderby > 0,
                    lit(format!("order by {order_cols} , {window_func} over w")),
                ),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ])
        });

        alt(vec![
            seq(vec![common_select.clone(), for_update.clone()]),
            seq(vec![
                lit("("),
                common_select.clone(),
                for_update.clone(),
                lit(")"),
                union_op.clone(),
                lit("("),
                common_select,
                for_update.clone(),
                lit(")"),
                opt_when(
                    w.query_has_orderby > 0 && !cols.is_empty(),
                    lits(["order by", cols_list.as_str()]),
                ),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ])
            .set_w(w.query_union),
            seq(vec![agg_select.clone(), for_update.clone()]),
            seq(vec![window_select.clone(), for_update.clone()]).set_w(w.query_window),
            seq(vec![
                lit("("),
                agg_select.clone(),
                for_update.clone(),
                lit(")"),
                union_op.clone(),
                lit("("),
                agg_select,
                for_update.clone(),
                lit(")"),
                opt_when(w.query_has_orderby > 0, lit("order by aggCol")),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ])
            .set_w(w.query_union),
            seq(vec![
                lit("("),
                window_select.clone(),
                for_update.clone(),
                lit(")"),
                union_op,
                lit("("),
                window_select,
                for_update,
                lit(")"),
                opt_when(w.query_has_orderby > 0, lit("order by 1")),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ])
            .set_w(w.query_window + w.query_union),
            when(state.tables().len() > 1, multi_table_query()),
        ])
    })
}

fn random_agg_func(table: &Table, agg_cols: &[ColumnId], rng: &mut ChaCha8Rng) -> String {
    if random_int(rng, 0, 5) == 0 {
        return "count(*) aggCol".to_string();
    }
    let funcs = ["count", "sum", "avg", "min", "max"];
    let func = *pick(&funcs, rng);
    let col = &table.column(*pick(agg_cols, rng)).name;
    format!("{func}({col}) aggCol")
}

fn random_window_func(rng: &mut ChaCha8Rng) -> String {
    let funcs = [
        "row_number ()",
        "rank ()",
        "dense_rank ()",
        "cume_dist ()",
        "percent_rank ()",
    ];
    pick(&funcs, rng).to_string()
}

fn random_window_spec(table: &Table, rng: &mut ChaCha8Rng) -> String {
    let order_col = &table.rand_column(rng).name;
    if random_bool(rng) {
        let partition_col = &table.rand_column(rng).name;
        format!("( partition by {partition_col} order by {order_col} )")
    } else {
        format!("( order by {order_col} )")
    }
}

/// 1..5 conjuncts/disjuncts, a point-get over a unique index, or — in
/// index-merge mode — several `and` groups stitched together with `or`.
pub(crate) fn predicates() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let tid = predicate_table(state);
        let unique_idx = {
            let (table, rng) = state.table_and_rng(tid);
            table.rand_unique_index_for_point_get(rng)
        };

        if w.query_index_merge {
            let and_predicates = lazy(|state: &mut State| {
                let tid = predicate_table(state);
                let (table, rng) = state.table_and_rng(tid);
                let prefix = table.rand_index_prefix_columns(rng);
                let mut cnt = prefix.len().max(1);
                table.col_for_prefix_index = prefix;
                if random_int(rng, 0, 4) == 0 {
                    cnt += random_int(rng, 1, 2) as usize;
                }
                repeat(predicate(), cnt, lit("and"))
            });
            // Leave some room for the plain predicate shapes.
            if random_int(state.rng_mut(), 0, 4) != 0 {
                return repeat_range(2, 5, and_predicates, lit("or"));
            }
        }

        let point_get = {
            lazy(move |state: &mut State| {
                let uidx = unique_idx.expect("guarded by the alt below");
                let (table, rng) = state.table_and_rng(tid);
                let idx_cols: Vec<ColumnId> =
                    table.index(uidx).columns.iter().map(|ic| ic.column).collect();
                let names: Vec<String> = idx_cols
                    .iter()
                    .map(|c| table.column(*c).name.clone())
                    .collect();
                let points = random_int(rng, 1, 4) as usize;
                let mut rows: Vec<Vec<String>> = Vec::with_capacity(points);
                for _ in 0..points {
                    // Bias half the points toward values known to exist.
                    if !table.values.is_empty() && random_bool(rng) {
                        rows.push(table.rand_row(&idx_cols, rng));
                    } else {
                        rows.push(table.gen_rand_values(&idx_cols, rng));
                    }
                }
                alt(vec![
                    lit(print_predicate_dnf(&names, &rows)),
                    lit(print_predicate_compound_dnf(&names, &rows)),
                    lit(print_predicate_in(&names, &rows)),
                ])
            })
        };

        alt(vec![
            repeat_range(1, 5, predicate(), alt(vec![lit("and"), lit("or")])).set_w(3),
            when(unique_idx.is_some(), point_get).set_w(1),
        ])
    })
}

/// `t.c <op> lit` or `t.c in ( … )`. In index-merge mode the column comes
/// from the prefix scratch, consumed front to back until it runs dry.
pub(crate) fn predicate() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let tid = predicate_table(state);
        let cid = {
            let (table, rng) = state.table_and_rng(tid);
            let mut cid = table.rand_column(rng).id;
            if w.query_index_merge && !table.col_for_prefix_index.is_empty() {
                cid = table.col_for_prefix_index.remove(0);
            }
            cid
        };
        let col_ref = {
            let table = state.table(tid);
            format!("{}.{}", table.name, table.column(cid).name)
        };

        let rand_val = lazy(move |state: &mut State| {
            let prepare = state
                .search(ScopeKey::CurrentPrepare)
                .map(|o| o.as_prepare());
            if prepare.is_some() && random_int(state.rng_mut(), 0, 49) == 0 {
                let snapshot = state.table(tid).column(cid).clone();
                state
                    .prepare_mut(prepare.expect("checked above"))
                    .append_param(snapshot);
                return lit("?");
            }
            let (table, rng) = state.table_and_rng(tid);
            let value = if random_int(rng, 0, 2) == 0 || table.values.is_empty() {
                table.column(cid).random_value(rng)
            } else {
                table
                    .rand_row_val(cid, rng)
                    .expect("values checked non-empty")
            };
            lit(value)
        });
        let rand_col_vals = repeat_range(1, 5, rand_val.clone(), lit(","));

        alt(vec![
            seq(vec![lit(col_ref.clone()), cmp_symbol(), rand_val]),
            seq(vec![
                lit(col_ref),
                lit("in"),
                lit("("),
                rand_col_vals,
                lit(")"),
            ]),
        ])
    })
}

fn cmp_symbol() -> Prod {
    alt(vec![
        lit("="),
        lit("<"),
        lit("<="),
        lit(">"),
        lit(">="),
        lit("<>"),
        lit("!="),
    ])
}

fn print_predicate_dnf(names: &[String], rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            let conj = names
                .iter()
                .zip(row)
                .map(|(n, v)| format!("{n} = {v}"))
                .join(" and ");
            format!("( {conj} )")
        })
        .join(" or ")
}

fn print_predicate_compound_dnf(names: &[String], rows: &[Vec<String>]) -> String {
    let tuple = format!("( {} )", names.join(" , "));
    rows.iter()
        .map(|row| format!("{tuple} = ( {} )", print_values(row)))
        .join(" or ")
}

fn print_predicate_in(names: &[String], rows: &[Vec<String>]) -> String {
    if names.len() == 1 {
        return format!(
            "{} in ( {} )",
            names[0],
            rows.iter().map(|r| &r[0]).join(" , ")
        );
    }
    let tuple = format!("( {} )", names.join(" , "));
    let items = rows
        .iter()
        .map(|row| format!("( {} )", print_values(row)))
        .join(" , ");
    format!("{tuple} in ( {items} )")
}

pub(crate) fn multi_table_query() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let t1 = state.rand_table();
        let t2 = state.rand_table();
        state.store(ScopeKey::CurrentMultiTable, ScopeObj::Tables(vec![t1, t2]));
        let (cols1, name1) = {
            let (table, rng) = state.table_and_rng(t1);
            (table.rand_columns(rng), table.name.clone())
        };
        let (cols2, name2) = {
            let (table, rng) = state.table_and_rng(t2);
            (table.rand_columns(rng), table.name.clone())
        };
        let q1 = print_qualified_column_names(state.table(t1), &cols1);
        let q2 = print_qualified_column_names(state.table(t2), &cols2);
        let all1 = {
            let table = state.table(t1);
            print_column_names(table, &all_column_ids(table), "")
        };
        let all2 = {
            let table = state.table(t2);
            print_column_names(table, &all_column_ids(table), "")
        };
        let prefer_index = random_bool(state.rng_mut());
        let tiflash_hint = format!("read_from_storage(tiflash[{name1},{name2}])");

        let join_predicate = lazy(move |state: &mut State| {
            let c1 = pick_join_column(state, t1, prefer_index);
            let c2 = pick_join_column(state, t2, prefer_index);
            let n1 = state.table(t1).column(c1).name.clone();
            let n2 = state.table(t2).column(c2).name.clone();
            seq(vec![lit(n1), cmp_symbol(), lit(n2)])
        });
        let join_predicates =
            repeat_range(1, 5, join_predicate, alt(vec![lit("and"), lit("or")]));

        let join_hint = {
            let (n1, n2) = (name1.clone(), name2.clone());
            lazy(move |_state: &mut State| {
                let no_index = alt(vec![
                    lit(format!("MERGE_JOIN({n1},{n2})")),
                    lit(format!("HASH_JOIN({n1},{n2})")),
                ]);
                let use_index = alt(vec![
                    lit(format!("INL_JOIN({n1},{n2})")),
                    lit(format!("INL_HASH_JOIN({n1},{n2})")),
                    lit(format!("INL_MERGE_JOIN({n1},{n2})")),
                ]);
                if prefer_index {
                    alt(vec![nothing(), use_index])
                } else {
                    alt(vec![nothing(), no_index])
                }
            })
        };

        let semi_join = {
            let (q1, name1, name2, all1, tiflash_hint) = (
                q1.clone(),
                name1.clone(),
                name2.clone(),
                all1.clone(),
                tiflash_hint.clone(),
            );
            let join_hint = join_hint.clone();
            lazy(move |state: &mut State| {
                let w = state.profile().clone();
                let c1 = pick_join_column(state, t1, prefer_index);
                let mut c2 = pick_join_column(state, t2, prefer_index);
                // Re-draw a few times toward a type-compatible pair.
                for _ in 0..=5 {
                    let tp1 = state.table(t1).column(c1).tp;
                    let tp2 = state.table(t2).column(c2).tp;
                    if (tp1.is_string() && tp2.is_string())
                        || (tp1.is_integer() && tp2.is_integer())
                        || tp1 == tp2
                    {
                        break;
                    }
                    c2 = pick_join_column(state, t2, prefer_index);
                }
                let c1_name = state.table(t1).column(c1).name.clone();
                let c2_name = state.table(t2).column(c2).name.clone();
                seq(vec![
                    lit("select"),
                    seq(vec![
                        lit("/*+"),
                        opt_when(w.enable_test_tiflash, lit(tiflash_hint.clone())),
                        join_hint.clone(),
                        lit("*/"),
                    ]),
                    lit(q1.clone()),
                    lit("from"),
                    lit(name1.clone()),
                    lit("where"),
                    lit(c1_name),
                    lit("in"),
                    lit("("),
                    lit("select"),
                    lit(c2_name),
                    lit("from"),
                    lit(name2.clone()),
                    lit("where"),
                    predicates(),
                    lit(")"),
                    opt_when(
                        w.query_has_orderby > 0,
                        lits(["order by", all1.as_str()]),
                    ),
                    opt_when(w.query_has_limit > 0, limit_clause()),
                ])
            })
        };

        alt(vec![
            seq(vec![
                lit("select"),
                seq(vec![
                    lit("/*+"),
                    opt_when(w.enable_test_tiflash, lit(tiflash_hint.clone())),
                    join_hint.clone(),
                    lit("*/"),
                ]),
                lit(q1.clone()),
                lit(","),
                lit(q2.clone()),
                lit("from"),
                lit(name1.clone()),
                alt(vec![lit("left join"), lit("join"), lit("right join")]),
                lit(name2.clone()),
                seq(vec![lit("on"), join_predicates]),
                lit("where"),
                predicates(),
                opt_when(
                    w.query_has_orderby > 0,
                    lit(format!("order by {all1} , {all2}")),
                ),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ]),
            seq(vec![
                lit("select"),
                seq(vec![
                    lit("/*+"),
                    opt_when(w.enable_test_tiflash, lit(tiflash_hint)),
                    opt_when(
                        w.query_index_merge,
                        lit(format!("use_index_merge({name1},{name2})")),
                    ),
                    join_hint,
                    lit("*/"),
                ]),
                lit(q1),
                lit(","),
                lit(q2),
                lit("from"),
                lit(name1),
                lit("join"),
                lit(name2),
                opt_when(
                    w.query_has_orderby > 0,
                    lit(format!("order by {all1} , {all2}")),
                ),
                opt_when(w.query_has_limit > 0, limit_clause()),
            ]),
            semi_join,
        ])
    })
}

fn pick_join_column(
    state: &mut State,
    tid: crate::model::TableId,
    prefer_index: bool,
) -> ColumnId {
    let (table, rng) = state.table_and_rng(tid);
    if prefer_index {
        table.rand_column_prefer_index(rng)
    } else {
        table.rand_column_simple(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::productions::start;
    use crate::profile::Profile;

    fn bootstrapped(seed: u64, profile: Profile) -> State {
        let mut state = State::new(seed, profile);
        while !state.initialized() {
            start().eval(&mut state);
        }
        state
    }

    #[test]
    fn point_get_printers() {
        let names = vec!["c0".to_string(), "c1".to_string()];
        let rows = vec![
            vec!["1".to_string(), "2".to_string()],
            vec!["3".to_string(), "4".to_string()],
        ];
        assert_eq!(
            print_predicate_dnf(&names, &rows),
            "( c0 = 1 and c1 = 2 ) or ( c0 = 3 and c1 = 4 )"
        );
        assert_eq!(
            print_predicate_compound_dnf(&names, &rows),
            "( c0 , c1 ) = ( 1 , 2 ) or ( c0 , c1 ) = ( 3 , 4 )"
        );
        assert_eq!(
            print_predicate_in(&names, &rows),
            "( c0 , c1 ) in ( ( 1 , 2 ) , ( 3 , 4 ) )"
        );
        let single = vec!["c0".to_string()];
        let single_rows = vec![vec!["7".to_string()], vec!["9".to_string()]];
        assert_eq!(
            print_predicate_in(&single, &single_rows),
            "c0 in ( 7 , 9 )"
        );
    }

    #[test]
    fn queries_reference_known_tables() {
        let mut state = bootstrapped(13, Profile::default());
        for _ in 0..100 {
            let sql = query().eval(&mut state);
            assert!(sql.contains("select"), "got {sql:?}");
            assert!(sql.contains("from"), "got {sql:?}");
        }
    }

    #[test]
    fn predicates_reference_qualified_or_point_get_columns() {
        let mut state = bootstrapped(14, Profile::default());
        let tid = state.tables()[0].id;
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(tid));
        for _ in 0..100 {
            let sql = predicates().eval(&mut state);
            assert!(!sql.is_empty());
            assert!(sql.contains('c'), "predicate without a column: {sql:?}");
        }
    }

    #[test]
    fn index_merge_predicates_join_and_groups_with_or() {
        let profile = Profile {
            query_index_merge: true,
            ..Profile::default()
        };
        let mut state = bootstrapped(15, profile);
        let tid = state.tables()[0].id;
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(tid));
        let mut saw_or = false;
        for _ in 0..50 {
            let sql = predicates().eval(&mut state);
            if sql.contains(" or ") {
                saw_or = true;
            }
        }
        assert!(saw_or, "index-merge predicates never produced an or-chain");
    }
}
