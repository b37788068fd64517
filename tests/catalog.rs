//! Catalog/stream consistency: the schema the generator believes in matches
//! the statements it emitted.

use sqlsurge::model::IndexKind;
use sqlsurge::state::State;
use sqlsurge::{Generator, Profile};

#[test]
fn create_table_emissions_match_catalog() {
    let mut generator = Generator::from_seed(11, Profile::default());
    let mut creates = 0;
    for _ in 0..400 {
        let sql = generator.generate();
        if sql.starts_with("create table ") {
            creates += 1;
        }
    }
    // Nothing in the default grammar removes tables, so emissions and
    // catalog entries stay in one-to-one correspondence.
    assert_eq!(creates, generator.state().tables().len());
    assert!(generator.state().tables().len() <= generator.state().profile().max_table_num);
}

#[test]
fn schema_invariants_hold_under_churn() {
    for seed in [3u64, 17, 99] {
        let profile = Profile {
            query_index_merge: true,
            can_read_gc_save_point: true,
            ..Profile::default()
        };
        let mut generator = Generator::from_seed(seed, profile);
        for _ in 0..400 {
            let sql = generator.generate();
            assert!(!sql.is_empty(), "seed {seed} emitted an empty statement");
            for table in generator.state().tables() {
                // A table never loses its last column.
                assert!(!table.columns.is_empty(), "{} lost all columns", table.name);
                // At most one primary index, and unique indexes contain
                // every partition column.
                let primaries = table
                    .indices
                    .iter()
                    .filter(|i| i.kind == IndexKind::Primary)
                    .count();
                assert!(primaries <= 1, "{} has {primaries} primary keys", table.name);
                for index in &table.indices {
                    assert!(!index.columns.is_empty());
                    if index.is_unique() {
                        for pc in &table.partition_columns {
                            assert!(
                                index.contains_column(*pc),
                                "{}: unique index {} misses partition column",
                                table.name,
                                index.name
                            );
                        }
                    }
                }
                // Sampled rows stay aligned with the evolving column set.
                for row in &table.values {
                    assert_eq!(row.len(), table.columns.len());
                }
            }
        }
    }
}

#[test]
fn drop_column_is_never_emitted_for_protected_columns() {
    let mut generator = Generator::from_seed(29, Profile::default());
    for _ in 0..500 {
        let sql = generator.generate();
        if sql.contains(" drop column ") {
            let table_name = sql
                .strip_prefix("alter table ")
                .and_then(|rest| rest.split(' ').next())
                .unwrap_or_else(|| panic!("malformed drop column: {sql:?}"));
            let table = generator
                .state()
                .tables()
                .iter()
                .find(|t| t.name == table_name)
                .expect("drop column targets a live table");
            // The drop already happened in the catalog; at least one column
            // must remain and any primary key keeps a column.
            assert!(!table.columns.is_empty());
            if let Some(pk) = table.primary_key_index() {
                assert!(!pk.columns.is_empty());
            }
        }
    }
}

#[test]
fn clone_then_remove_restores_the_catalog() {
    let mut state = State::new(5, Profile::default());
    let src = state.new_table();
    for _ in 0..4 {
        state.new_column(src);
    }
    let index = state.gen_index(src, true);
    state.table_mut(src).append_index(index);

    let snapshot = state.tables().to_vec();
    let clone = state.clone_table(src);
    assert_eq!(state.tables().len(), 2);
    state.remove_table(clone);
    // Identical modulo the consumed ID allocator counters.
    assert_eq!(snapshot, state.tables().to_vec());
}
