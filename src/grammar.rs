//! Lazy, weighted grammar combinators.
//!
//! A production is a node that, evaluated against the generator state, emits
//! a SQL fragment and may mutate the catalog along the way. Named productions
//! are [`lazy`] thunks, so the grammar forms a directed graph (cycles
//! included) and an unchosen branch never runs its side effects.

use std::rc::Rc;

use crate::rng::{frequency, random_int};
use crate::state::State;

#[derive(Clone)]
pub struct Prod {
    weight: u32,
    enabled: bool,
    kind: ProdKind,
}

#[derive(Clone)]
enum ProdKind {
    Lit(String),
    Nothing,
    Seq(Vec<Prod>),
    Alt(Vec<Prod>),
    Repeat {
        lo: usize,
        hi: usize,
        item: Rc<Prod>,
        sep: Rc<Prod>,
    },
    Lazy(Rc<dyn Fn(&mut State) -> Prod>),
    Unreachable,
}

impl Prod {
    fn new(kind: ProdKind) -> Self {
        Self {
            weight: 1,
            enabled: true,
            kind,
        }
    }

    /// Override the weight used when this node sits under an [`alt`].
    pub fn set_w(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    fn draw_weight(&self) -> u32 {
        if self.enabled {
            self.weight
        } else {
            0
        }
    }

    /// Evaluate the node, producing one space-separated token stream.
    pub fn eval(&self, state: &mut State) -> String {
        if !self.enabled {
            return String::new();
        }
        match &self.kind {
            ProdKind::Lit(s) => s.clone(),
            ProdKind::Nothing => String::new(),
            ProdKind::Unreachable => {
                panic!("evaluated a grammar branch marked unreachable")
            }
            ProdKind::Seq(children) => {
                let mut parts = Vec::with_capacity(children.len());
                for child in children {
                    let out = child.eval(state);
                    if !out.is_empty() {
                        parts.push(out);
                    }
                }
                parts.join(" ")
            }
            ProdKind::Alt(children) => {
                let weights: Vec<u32> = children.iter().map(Prod::draw_weight).collect();
                match frequency(&weights, state.rng_mut()) {
                    Some(i) => children[i].eval(state),
                    None => String::new(),
                }
            }
            ProdKind::Repeat { lo, hi, item, sep } => {
                let n = if lo == hi {
                    *lo
                } else {
                    random_int(state.rng_mut(), *lo as i64, *hi as i64) as usize
                };
                let mut parts = Vec::with_capacity(n * 2);
                for i in 0..n {
                    if i > 0 {
                        let s = sep.eval(state);
                        if !s.is_empty() {
                            parts.push(s);
                        }
                    }
                    let s = item.eval(state);
                    if !s.is_empty() {
                        parts.push(s);
                    }
                }
                parts.join(" ")
            }
            ProdKind::Lazy(thunk) => {
                state.scope_mut().push_frame();
                let prod = thunk(state);
                let out = prod.eval(state);
                state.scope_mut().pop_frame();
                out
            }
        }
    }
}

/// Emit `s` verbatim.
pub fn lit(s: impl Into<String>) -> Prod {
    Prod::new(ProdKind::Lit(s.into()))
}

/// Emit the arguments joined by single spaces.
pub fn lits<I>(parts: I) -> Prod
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let joined = parts
        .into_iter()
        .map(Into::into)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Prod::new(ProdKind::Lit(joined))
}

/// Emit nothing; a no-op participant in [`alt`] and [`opt`].
pub fn nothing() -> Prod {
    Prod::new(ProdKind::Nothing)
}

/// Evaluate each child left to right; earlier side effects are visible to
/// later siblings.
pub fn seq(children: Vec<Prod>) -> Prod {
    Prod::new(ProdKind::Seq(children))
}

/// Weighted choice. Children default to weight 1; disabled or zero-weight
/// children are excluded, and an all-zero draw emits the empty string.
pub fn alt(children: Vec<Prod>) -> Prod {
    Prod::new(ProdKind::Alt(children))
}

/// Guard: when `cond` is false the child contributes nothing and its
/// effective weight under [`alt`] is zero regardless of later `set_w` calls.
pub fn when(cond: bool, child: Prod) -> Prod {
    if cond {
        child
    } else {
        Prod {
            weight: 1,
            enabled: false,
            kind: ProdKind::Nothing,
        }
    }
}

/// Fifty-fifty optional child.
pub fn opt(child: Prod) -> Prod {
    alt(vec![nothing(), child])
}

/// Optional child when `cond` holds, nothing otherwise.
pub fn opt_when(cond: bool, child: Prod) -> Prod {
    when(cond, opt(child))
}

/// Evaluate `item` exactly `n` times, interleaving `sep`.
pub fn repeat(item: Prod, n: usize, sep: Prod) -> Prod {
    Prod::new(ProdKind::Repeat {
        lo: n,
        hi: n,
        item: Rc::new(item),
        sep: Rc::new(sep),
    })
}

/// Evaluate `item` between `lo` and `hi` times (uniform), interleaving `sep`.
pub fn repeat_range(lo: usize, hi: usize, item: Prod, sep: Prod) -> Prod {
    assert!(lo <= hi, "repeat range {lo}..={hi} is empty");
    Prod::new(ProdKind::Repeat {
        lo,
        hi,
        item: Rc::new(item),
        sep: Rc::new(sep),
    })
}

/// Fatal marker for branches the grammar must never take.
pub fn unreachable_branch() -> Prod {
    Prod::new(ProdKind::Unreachable)
}

/// A named production: the thunk runs only when the node is chosen, under a
/// fresh scope frame.
pub fn lazy(thunk: impl Fn(&mut State) -> Prod + 'static) -> Prod {
    Prod::new(ProdKind::Lazy(Rc::new(thunk)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;
    use crate::state::State;

    fn test_state() -> State {
        State::new(42, Profile::default())
    }

    #[test]
    fn seq_joins_with_single_spaces() {
        let mut state = test_state();
        let p = seq(vec![lit("select"), nothing(), lit("1")]);
        assert_eq!(p.eval(&mut state), "select 1");
    }

    #[test]
    fn lits_drops_empty_parts() {
        let mut state = test_state();
        let p = lits(["drop", "", "table", "t1"]);
        assert_eq!(p.eval(&mut state), "drop table t1");
    }

    #[test]
    fn alt_with_all_zero_weights_emits_empty() {
        let mut state = test_state();
        let p = alt(vec![lit("a").set_w(0), when(false, lit("b")).set_w(5)]);
        assert_eq!(p.eval(&mut state), "");
    }

    #[test]
    fn disabled_guard_ignores_later_weight() {
        let mut state = test_state();
        let p = alt(vec![when(false, lit("never")).set_w(100), lit("always")]);
        for _ in 0..50 {
            assert_eq!(p.eval(&mut state), "always");
        }
    }

    #[test]
    fn repeat_interleaves_separator() {
        let mut state = test_state();
        let p = repeat(lit("x"), 3, lit(","));
        assert_eq!(p.eval(&mut state), "x , x , x");
    }

    #[test]
    fn repeat_range_stays_in_bounds() {
        let mut state = test_state();
        let p = repeat_range(2, 4, lit("y"), lit("and"));
        for _ in 0..50 {
            let out = p.eval(&mut state);
            let n = out.split(" and ").count();
            assert!((2..=4).contains(&n), "unexpected arity in {out:?}");
        }
    }

    #[test]
    fn lazy_branches_do_not_run_until_chosen() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut state = test_state();
        let hits = Rc::new(Cell::new(0));
        let probe = {
            let hits = Rc::clone(&hits);
            lazy(move |_| {
                hits.set(hits.get() + 1);
                lit("hit")
            })
        };
        let p = alt(vec![probe.set_w(0), lit("miss")]);
        assert_eq!(p.eval(&mut state), "miss");
        assert_eq!(hits.get(), 0, "zero-weight branch must stay cold");
    }

    #[test]
    #[should_panic(expected = "unreachable")]
    fn unreachable_branch_is_fatal() {
        let mut state = test_state();
        unreachable_branch().eval(&mut state);
    }
}
