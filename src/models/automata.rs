//! Lowering of position automata to runtime automata
//!
//! Once Unique Particle Attribution holds, at most one position of any follow
//! set accepts a given element, so the position automaton is deterministic:
//! its states are the start state plus one state per position. Small models
//! become a dense transition table indexed by matcher column; larger ones
//! keep the follow sets as bitsets. Counted repetitions travel with either
//! form as [`CounterRow`]s.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::limits::Limits;

use super::glushkov::{Counter, Glushkov};

/// Occurrence bounds over a group of positions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CounterRow {
    /// Counted positions, ascending
    pub positions: Vec<u32>,
    /// Fewest consecutive matches in the group
    pub min: u32,
    /// Most consecutive matches; `u32::MAX` is unbounded
    pub max: u32,
}

impl From<&Counter> for CounterRow {
    fn from(c: &Counter) -> Self {
        CounterRow {
            positions: c.positions.iter().map(|p| *p as u32).collect(),
            min: c.min,
            max: c.max.unwrap_or(u32::MAX),
        }
    }
}

/// Dense deterministic automaton
///
/// State 0 is the dead state and state 1 the start state; the state for
/// position `p` is `p + 2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dfa {
    /// Number of states, the dead state included
    pub states: u32,
    /// Matcher ID of each column
    pub columns: Vec<u32>,
    /// `states × columns` next states
    pub table: Vec<u32>,
    /// Accepting flag per state
    pub accepting: Vec<bool>,
    /// Counted repetitions, by position
    pub counters: Vec<CounterRow>,
}

impl Dfa {
    /// Start state
    pub const START: u32 = 1;

    /// Next state on the column of `matcher`, 0 if there is none
    pub fn next(&self, state: u32, matcher: u32) -> u32 {
        match self.columns.binary_search(&matcher) {
            Ok(column) => self
                .table
                .get(state as usize * self.columns.len() + column)
                .copied()
                .unwrap_or(0),
            Err(_) => 0,
        }
    }
}

/// Follow-set automaton over position bitsets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Nfa {
    /// Number of positions
    pub positions: u32,
    /// 64-bit words per bitset
    pub words: u32,
    /// Matcher ID of each position
    pub matchers: Vec<u32>,
    /// Positions that can start a match
    pub first: Vec<u64>,
    /// Positions that can end a match
    pub last: Vec<u64>,
    /// Follow sets, `words` per position
    pub follow: Vec<u64>,
    /// Whether the empty sequence is accepted
    pub nullable: bool,
    /// Counted repetitions
    pub counters: Vec<CounterRow>,
}

impl Nfa {
    /// Automaton that accepts nothing, used for empty choices
    pub fn reject_all() -> Self {
        Nfa {
            positions: 0,
            words: 0,
            matchers: Vec::new(),
            first: Vec::new(),
            last: Vec::new(),
            follow: Vec::new(),
            nullable: false,
            counters: Vec::new(),
        }
    }

    /// Whether this is the reject-all automaton
    pub fn is_reject_all(&self) -> bool {
        self.positions == 0 && !self.nullable
    }

    /// Follow set of a position
    pub fn follow_of(&self, position: u32) -> &[u64] {
        let words = self.words as usize;
        let start = position as usize * words;
        self.follow.get(start..start + words).unwrap_or(&[])
    }
}

/// Test bit `i` of a bitset
pub fn bit(set: &[u64], i: usize) -> bool {
    set.get(i / 64).map_or(false, |w| w & (1u64 << (i % 64)) != 0)
}

fn bitset<'a>(words: usize, items: impl Iterator<Item = &'a usize>) -> Vec<u64> {
    let mut set = vec![0u64; words];
    for i in items {
        set[i / 64] |= 1u64 << (i % 64);
    }
    set
}

/// Compiled content-model automaton
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Automaton {
    /// Dense table
    Dfa(Dfa),
    /// Follow sets
    Nfa(Nfa),
}

/// Lower a position automaton
///
/// `matchers[p]` is the matcher ID of position `p`; positions that accept the
/// same elements must share an ID. A model with more states than
/// `limits.max_dfa_states` is kept as an [`Nfa`], as is a counted model whose
/// table would need two targets in one cell.
pub fn compile(g: &Glushkov, matchers: &[u32], limits: &Limits) -> Result<Automaton> {
    if matchers.len() != g.positions.len() {
        return Err(Error::constraint(format!(
            "{} matchers for {} positions",
            matchers.len(),
            g.positions.len()
        )));
    }
    if g.rejects_all() {
        return Ok(Automaton::Nfa(Nfa::reject_all()));
    }
    let states = g.positions.len() + 2;
    if states > limits.max_dfa_states {
        return Ok(Automaton::Nfa(follow_sets(g, matchers)));
    }
    match table(g, matchers) {
        Ok(dfa) => Ok(Automaton::Dfa(dfa)),
        Err(_) if !g.counters.is_empty() => Ok(Automaton::Nfa(follow_sets(g, matchers))),
        Err(e) => Err(e),
    }
}

fn follow_sets(g: &Glushkov, matchers: &[u32]) -> Nfa {
    let words = (g.positions.len() + 63) / 64;
    let mut follow = Vec::with_capacity(words * g.positions.len());
    for set in &g.follow {
        follow.extend(bitset(words, set.iter()));
    }
    Nfa {
        positions: g.positions.len() as u32,
        words: words as u32,
        matchers: matchers.to_vec(),
        first: bitset(words, g.first.iter()),
        last: bitset(words, g.last.iter()),
        follow,
        nullable: g.nullable,
        counters: g.counters.iter().map(CounterRow::from).collect(),
    }
}

fn table(g: &Glushkov, matchers: &[u32]) -> Result<Dfa> {
    let states = g.positions.len() + 2;
    let mut columns: Vec<u32> = matchers.to_vec();
    columns.sort_unstable();
    columns.dedup();
    let width = columns.len();
    let mut table = vec![0u32; states * width];
    let fill = |table: &mut Vec<u32>, state: usize, targets: &BTreeSet<usize>| -> Result<()> {
        for p in targets {
            let column = columns
                .binary_search(&matchers[*p])
                .map_err(|_| Error::constraint("matcher without a column"))?;
            let cell = &mut table[state * width + column];
            if *cell != 0 {
                return Err(Error::constraint(
                    "content model is ambiguous: two particles accept the same element",
                ));
            }
            *cell = *p as u32 + 2;
        }
        Ok(())
    };
    fill(&mut table, Dfa::START as usize, &g.first)?;
    for (p, follow) in g.follow.iter().enumerate() {
        fill(&mut table, p + 2, follow)?;
    }

    let mut accepting = vec![false; states];
    accepting[Dfa::START as usize] = g.nullable;
    for p in &g.last {
        accepting[p + 2] = true;
    }
    Ok(Dfa {
        states: states as u32,
        columns,
        table,
        accepting,
        counters: g.counters.iter().map(CounterRow::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::glushkov::{build_glushkov, Expr, Symbol};
    use crate::schema::ElemHandle;

    fn leaf(i: u32) -> Expr {
        Expr::Leaf(Symbol::Element(ElemHandle(i)))
    }

    #[test]
    fn test_dfa_transitions() {
        // a b*
        let expr = Expr::Seq(vec![leaf(0), leaf(1).repeat(0, None)]);
        let g = build_glushkov(&expr, &Limits::default()).unwrap();
        let dfa = match compile(&g, &[10, 20], &Limits::default()).unwrap() {
            Automaton::Dfa(dfa) => dfa,
            other => panic!("expected a DFA, got {:?}", other),
        };
        assert_eq!(dfa.states, 4);
        let s = dfa.next(Dfa::START, 10);
        assert_eq!(s, 2);
        assert!(dfa.accepting[s as usize]);
        assert_eq!(dfa.next(s, 20), 3);
        assert_eq!(dfa.next(3, 20), 3);
        assert_eq!(dfa.next(Dfa::START, 20), 0);
        assert!(!dfa.accepting[Dfa::START as usize]);
    }

    #[test]
    fn test_large_models_become_nfas() {
        let expr = leaf(0).repeat(0, Some(10));
        let g = build_glushkov(&expr, &Limits::default()).unwrap();
        let limits = Limits {
            max_dfa_states: 4,
            ..Limits::default()
        };
        let nfa = match compile(&g, &[7; 10], &limits).unwrap() {
            Automaton::Nfa(nfa) => nfa,
            other => panic!("expected an NFA, got {:?}", other),
        };
        assert_eq!(nfa.positions, 10);
        assert!(nfa.nullable);
        assert!(bit(&nfa.first, 0));
        assert!(!bit(&nfa.first, 1));
        assert!(bit(nfa.follow_of(0), 1));
        assert!(bit(&nfa.last, 9));
    }

    #[test]
    fn test_ambiguity_and_reject_all() {
        let g = build_glushkov(&Expr::Choice(vec![leaf(0), leaf(0)]), &Limits::default()).unwrap();
        assert!(compile(&g, &[1, 1], &Limits::default()).is_err());

        let empty = build_glushkov(&Expr::Choice(Vec::new()), &Limits::default()).unwrap();
        match compile(&empty, &[], &Limits::default()).unwrap() {
            Automaton::Nfa(nfa) => assert!(nfa.is_reject_all()),
            other => panic!("expected reject-all, got {:?}", other),
        }
    }

    #[test]
    fn test_counted_repeat_keeps_one_position() {
        // a{3,3} a: the counter, not the table, decides when to leave
        let limits = Limits {
            max_unrolled_occurs: 2,
            ..Limits::default()
        };
        let expr = Expr::Seq(vec![leaf(0).repeat(3, Some(3)), leaf(1)]);
        let g = build_glushkov(&expr, &limits).unwrap();
        assert_eq!(g.positions.len(), 2);
        let nfa = match compile(&g, &[5, 5], &limits).unwrap() {
            Automaton::Nfa(nfa) => nfa,
            other => panic!("expected an NFA, got {:?}", other),
        };
        assert_eq!(
            nfa.counters,
            vec![CounterRow {
                positions: vec![0],
                min: 3,
                max: 3
            }]
        );
        assert!(bit(nfa.follow_of(0), 0));
        assert!(bit(nfa.follow_of(0), 1));

        let star = build_glushkov(&leaf(0).repeat(1, None).repeat(0, Some(1)), &limits).unwrap();
        match compile(&star, &[5], &limits).unwrap() {
            Automaton::Dfa(dfa) => assert!(dfa.counters.is_empty()),
            other => panic!("expected a DFA, got {:?}", other),
        }
    }
}
