//! sqlsurge: a randomized SQL workload generator for differential testing
//! of MySQL-dialect databases.
//!
//! A weighted, recursive, lazy grammar drives statement selection against an
//! in-memory catalog that evolves in lock-step with every emitted statement,
//! so each one is well-formed against the schema the stream has built so
//! far. The driver boundary in [`runner`] executes statements on two
//! databases and reports divergences.
//!
//! ```
//! use sqlsurge::{Generator, Profile};
//!
//! let mut generator = Generator::from_seed(42, Profile::default());
//! let sql = generator.generate();
//! assert!(sql.starts_with("create table"));
//! ```

pub mod grammar;
pub mod model;
pub mod productions;
pub mod profile;
pub mod rng;
pub mod runner;
pub mod scope;
pub mod state;

pub use profile::{AggHint, PartitionPin, Profile};
pub use runner::{
    run_interact_test, run_interact_test_no_sort, DiffError, ExecError, ResultSet, SqlExecutor,
    SqlOutcome,
};
pub use scope::{ScopeKey, ScopeObj};
pub use state::State;

/// Stateful producer: every [`Generator::generate`] call yields exactly one
/// complete SQL statement and leaves the catalog consistent with it.
pub struct Generator {
    state: State,
}

impl Generator {
    pub fn new(state: State) -> Self {
        Self { state }
    }

    pub fn from_seed(seed: u64, profile: Profile) -> Self {
        Self::new(State::new(seed, profile))
    }

    pub fn generate(&mut self) -> String {
        let sql = productions::start().eval(&mut self.state);
        tracing::debug!(%sql, "generated statement");
        sql
    }

    /// The live state, for inspection in tests and drivers.
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }
}

/// Closure-shaped variant of [`Generator`] for drivers that only need the
/// statement stream.
pub fn new_generator(state: State) -> impl FnMut() -> String {
    let mut generator = Generator::new(state);
    move || generator.generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_emits_statements() {
        let mut generator = Generator::from_seed(1, Profile::default());
        for _ in 0..50 {
            let sql = generator.generate();
            assert!(!sql.is_empty());
            assert!(!sql.contains('\n'));
        }
    }

    #[test]
    fn closure_form_shares_the_same_stream() {
        let mut direct = Generator::from_seed(7, Profile::default());
        let mut closure = new_generator(State::new(7, Profile::default()));
        for _ in 0..50 {
            assert_eq!(direct.generate(), closure());
        }
    }
}
