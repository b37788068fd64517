//! Prepared-statement lifecycle: `prepare`, parameterized execution via the
//! deferred queue, and `deallocate`.

use crate::grammar::{lazy, lit, lits, seq, Prod};
use crate::productions::query;
use crate::scope::{ScopeKey, ScopeObj};

pub fn prepare_stmt() -> Prod {
    lazy(|state| {
        // A prepare body never embeds another prepare.
        assert!(
            state.search(ScopeKey::CurrentPrepare).is_none(),
            "prepare_stmt nested inside a prepare body"
        );
        let pid = state.new_prepare();
        state.store(ScopeKey::CurrentPrepare, ScopeObj::Prepare(pid));
        let name = state.prepare(pid).name.clone();
        seq(vec![
            lit("prepare"),
            lit(name),
            lit("from"),
            lit("\""),
            query::query(),
            lit("\""),
        ])
    })
}

/// Emit the first `set @u1 = …` immediately and queue the remaining
/// assignments plus the `execute … using …` so they run back to back.
pub fn query_prepare() -> Prod {
    lazy(|state| {
        assert!(!state.prepares().is_empty(), "no prepared statement to run");
        let pid = state.rand_prepare();
        let prepared = state.prepare(pid).clone();
        let assignments = prepared.gen_assignments(state.rng_mut());
        if assignments.is_empty() {
            return lit(format!("execute {}", prepared.name));
        }
        for assignment in &assignments[1..] {
            state.push_deferred(assignment.clone());
        }
        state.push_deferred(format!(
            "execute {} using {}",
            prepared.name,
            prepared.user_vars().join(",")
        ));
        lit(assignments[0].clone())
    })
}

pub fn dealloc_prepare_stmt() -> Prod {
    lazy(|state| {
        assert!(!state.prepares().is_empty(), "no prepared statement to drop");
        let pid = state.rand_prepare();
        let prepared = state.remove_prepare(pid);
        lits(["deallocate prepare", prepared.name.as_str()])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::productions::start;
    use crate::profile::Profile;
    use crate::state::State;

    fn bootstrapped(seed: u64) -> State {
        let mut state = State::new(seed, Profile::default());
        while !state.initialized() {
            start().eval(&mut state);
        }
        state
    }

    #[test]
    fn prepare_body_placeholders_match_captured_params() {
        for seed in 0..20 {
            let mut state = bootstrapped(seed);
            let sql = prepare_stmt().eval(&mut state);
            assert!(sql.starts_with("prepare p"), "got {sql:?}");
            let placeholders = sql.matches('?').count();
            let prepared = state.prepares().last().unwrap();
            assert_eq!(
                placeholders,
                prepared.params.len(),
                "placeholder/parameter drift in {sql:?}"
            );
        }
    }

    #[test]
    fn query_prepare_defers_execution_tail() {
        let mut state = bootstrapped(3);
        prepare_stmt().eval(&mut state);
        let pid = state.prepares()[0].id;
        let params = state.prepares()[0].params.len();
        let first = query_prepare().eval(&mut state);
        let name = state.prepare(pid).name.clone();
        if params == 0 {
            assert_eq!(first, format!("execute {name}"));
            assert!(state.deferred().is_empty());
        } else {
            assert!(first.starts_with("set @u1 = "), "got {first:?}");
            // Remaining assignments then the execute, in FIFO order.
            assert_eq!(state.deferred().len(), params);
            let tail = state.deferred().back().unwrap();
            assert!(tail.starts_with(&format!("execute {name} using @u1")));
        }
    }

    #[test]
    fn dealloc_removes_the_statement() {
        let mut state = bootstrapped(4);
        prepare_stmt().eval(&mut state);
        assert_eq!(state.prepares().len(), 1);
        let sql = dealloc_prepare_stmt().eval(&mut state);
        assert!(sql.starts_with("deallocate prepare p"), "got {sql:?}");
        assert!(state.prepares().is_empty());
    }
}
