//! DDL productions. Each one mutates the catalog in the same step that it
//! emits the statement, so follow-up statements always see the new schema.

use crate::grammar::{alt, lazy, lit, lits, nothing, opt_when, repeat, repeat_range, seq, when, Prod};
use crate::model::IndexKind;
use crate::productions::print_index_columns;
use crate::profile::PartitionPin;
use crate::rng::{random_bool, random_groups, random_int, random_num};
use crate::scope::{ScopeKey, ScopeObj};
use crate::state::State;

pub fn create_table() -> Prod {
    lazy(|state| {
        let w = state.profile().clone();
        let tid = state.new_table();
        let initialized = state.initialized();

        let col_def = lazy(move |state: &mut State| {
            let cid = state.new_column(tid);
            let table = state.table(tid);
            let col = table.column(cid);
            lits([col.name.clone(), col.sql_definition()])
        });
        let col_defs = if initialized {
            repeat_range(
                1,
                state.profile().create_table_max_column_cnt,
                col_def,
                lit(","),
            )
        } else {
            repeat(col_def, state.profile().init_col_count, lit(","))
        };

        let cluster_hint = w.create_table_with_cluster_hint && state.clustered_enabled();
        let idx_def = lazy(move |state: &mut State| {
            let mut index = state.gen_index(tid, true);
            if index.is_unique() {
                // Unique and primary keys must cover the partition column
                // recorded by the partition clause.
                if let Some(obj) = state.search(ScopeKey::CurrentPartitionColumn) {
                    index.append_column_if_missing(obj.as_column());
                }
            }
            let is_primary = index.kind == IndexKind::Primary;
            state.table_mut(tid).append_index(index);
            let table = state.table(tid);
            let index = table.indices.last().expect("index appended above");
            seq(vec![
                lit(index.kind_keyword()),
                lit("key"),
                lit(index.name.clone()),
                lit("("),
                lit(print_index_columns(table, index)),
                lit(")"),
                opt_when(
                    is_primary && cluster_hint,
                    lit("/*T![clustered_index] clustered */"),
                ),
            ])
        });
        let idx_defs = repeat_range(1, w.create_table_index_more_col, idx_def, lit(","));

        let partition_def = lazy(move |state: &mut State| {
            let pin = state.profile().create_table_partition_type;
            let (table, rng) = state.table_and_rng(tid);
            let Some(cid) = table.rand_column_for_partition(rng) else {
                return nothing();
            };
            state.store_in_parent(ScopeKey::CurrentPartitionColumn, ScopeObj::Column(cid));
            state.table_mut(tid).append_partition_column(cid);

            const HASH: i64 = 0;
            const RANGE: i64 = 1;
            const LIST: i64 = 2;
            let choice = match pin {
                PartitionPin::Hash => HASH,
                PartitionPin::Range => RANGE,
                PartitionPin::List => LIST,
                PartitionPin::Random => random_int(state.rng_mut(), 0, 5),
            };
            let (table, rng) = state.table_and_rng(tid);
            let col = table.column(cid);
            let col_name = col.name.clone();
            match choice {
                HASH => lits([
                    "partition by".to_string(),
                    "hash(".to_string(),
                    col_name,
                    ")".to_string(),
                    "partitions".to_string(),
                    random_num(rng, 1, 6),
                ]),
                RANGE => {
                    let cnt = random_int(rng, 1, 5) as usize;
                    let mut vals = col.random_values_asc(rng, cnt);
                    if random_bool(rng) {
                        vals.push("maxvalue".to_string());
                    }
                    let defs = vals
                        .iter()
                        .enumerate()
                        .map(|(i, v)| format!("partition p{i} values less than ( {v} )"))
                        .collect::<Vec<_>>()
                        .join(" , ");
                    lits([
                        "partition by range (".to_string(),
                        col_name,
                        ") (".to_string(),
                        defs,
                        ")".to_string(),
                    ])
                }
                LIST => {
                    let vals = col.random_values_asc(rng, 20);
                    let groups = random_groups(&vals, 3, rng);
                    let defs = groups
                        .iter()
                        .enumerate()
                        .map(|(i, g)| format!("partition p{i} values in ( {} )", g.join(" , ")))
                        .collect::<Vec<_>>()
                        .join(" , ");
                    lits([
                        "partition by".to_string(),
                        "list(".to_string(),
                        col_name,
                        ") (".to_string(),
                        defs,
                        ")".to_string(),
                    ])
                }
                _ => nothing(),
            }
        });

        if w.enable_test_tiflash {
            let name = state.table(tid).name.clone();
            state.push_deferred(format!("alter table {name} set tiflash replica 1"));
            state.push_deferred("select sleep(20)");
        }

        // Indexes join the table rarely unless index-merge testing wants a
        // rich index surface on every table. The decision comes first so an
        // unemitted index never reaches the catalog.
        let emit_indexes = w.query_index_merge || random_int(state.rng_mut(), 0, 9) == 0;

        // Evaluation order matters: the partition clause records its column
        // before any unique index is generated, even though the clause text
        // renders last.
        let e_col_defs = col_defs.eval(state);
        let e_partition = partition_def.eval(state);
        let e_idx_defs = if emit_indexes {
            idx_defs.eval(state)
        } else {
            String::new()
        };
        let name = state.table(tid).name.clone();
        seq(vec![
            lit("create table"),
            lit(name),
            lit("("),
            lit(e_col_defs),
            when(!e_idx_defs.is_empty(), seq(vec![lit(","), lit(e_idx_defs)])),
            lit(")"),
            lit(e_partition),
        ])
    })
}

pub fn create_table_like() -> Prod {
    lazy(|state| {
        let src = state.rand_table();
        let clone = state.clone_table(src);
        lits([
            "create table",
            state.table(clone).name.as_str(),
            "like",
            state.table(src).name.as_str(),
        ])
    })
}

pub fn ddl_stmt() -> Prod {
    lazy(|state| {
        let tid = state.rand_table();
        state.store(ScopeKey::CurrentTable, ScopeObj::Table(tid));
        let table = state.table(tid);
        let droppable = table.columns.len() > 1 && table.has_droppable_column();
        let has_index = !table.indices.is_empty();
        let type_change = state.profile().enable_column_type_change;
        alt(vec![
            add_column(),
            add_index(),
            when(droppable, drop_column()),
            when(has_index, drop_index()),
            when(type_change, alter_column()),
        ])
    })
}

fn current_table(state: &State) -> crate::model::TableId {
    state
        .search(ScopeKey::CurrentTable)
        .expect("DDL production outside a table scope")
        .as_table()
}

fn add_column() -> Prod {
    lazy(|state| {
        let tid = current_table(state);
        let cid = state.new_column(tid);
        let table = state.table(tid);
        let col = table.column(cid);
        let def = col.sql_definition();
        lits([
            "alter table",
            table.name.as_str(),
            "add column",
            col.name.as_str(),
            def.as_str(),
        ])
    })
}

fn drop_column() -> Prod {
    lazy(|state| {
        let tid = current_table(state);
        let (table, rng) = state.table_and_rng(tid);
        let cid = table
            .rand_droppable_column(rng)
            .expect("ddl_stmt guards droppability");
        let col = table.remove_column(cid);
        lits([
            "alter table",
            table.name.as_str(),
            "drop column",
            col.name.as_str(),
        ])
    })
}

fn add_index() -> Prod {
    lazy(|state| {
        let tid = current_table(state);
        let index = state.gen_index(tid, false);
        state.table_mut(tid).append_index(index);
        let table = state.table(tid);
        let index = table.indices.last().expect("index appended above");
        let keyword = match index.kind {
            IndexKind::Unique => "add unique index",
            IndexKind::NonUnique => "add index",
            IndexKind::Primary => unreachable!("add_index never generates a primary key"),
        };
        let parts = print_index_columns(table, index);
        lits([
            "alter table",
            table.name.as_str(),
            keyword,
            index.name.as_str(),
            "(",
            parts.as_str(),
            ")",
        ])
    })
}

fn drop_index() -> Prod {
    lazy(|state| {
        let tid = current_table(state);
        let (table, rng) = state.table_and_rng(tid);
        let iid = table.rand_index(rng).expect("ddl_stmt guards index presence").id;
        let index = table.remove_index(iid);
        lits([
            "alter table",
            table.name.as_str(),
            "drop index",
            index.name.as_str(),
        ])
    })
}

fn alter_column() -> Prod {
    lazy(|state| {
        let mut new_col = state.gen_column();
        let tid = current_table(state);
        let (table, rng) = state.table_and_rng(tid);
        let old = table.rand_column(rng);
        let old_id = old.id;
        let old_name = old.name.clone();
        let table_name = table.name.clone();
        if random_bool(rng) {
            // modify: same name, new type
            new_col.name = old_name.clone();
            let def = new_col.sql_definition();
            table.replace_column(old_id, new_col);
            lits([
                "alter table",
                table_name.as_str(),
                "modify column",
                old_name.as_str(),
                def.as_str(),
            ])
        } else {
            // change: new name, new type
            let new_name = new_col.name.clone();
            let def = new_col.sql_definition();
            table.replace_column(old_id, new_col);
            lits([
                "alter table",
                table_name.as_str(),
                "change column",
                old_name.as_str(),
                new_name.as_str(),
                def.as_str(),
            ])
        }
    })
}
