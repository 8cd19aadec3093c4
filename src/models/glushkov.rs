//! Glushkov position automata
//!
//! A content-model expression is turned into its position automaton: one
//! position per symbol occurrence, the `first` and `last` position sets, the
//! `follow` set of every position and whether the empty sequence is accepted.
//! Bounded repetitions are unrolled into copies of the repeated expression,
//! with the optional copies nested so that `a{1,3}` reads `a (a (a)?)?`.
//! A single symbol repeated more than `max_unrolled_occurs` times is not
//! unrolled: it keeps one position that loops on itself, and a [`Counter`]
//! carries the bounds.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::schema::{ElemHandle, Wildcard};

/// What a position matches
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// An element declaration (never a reference)
    Element(ElemHandle),
    /// An element wildcard
    Wildcard(Wildcard),
}

/// Content-model expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The empty sequence
    Empty,
    /// Matches nothing, not even the empty sequence
    Reject,
    /// One symbol
    Leaf(Symbol),
    /// Sequence
    Seq(Vec<Expr>),
    /// Choice; an empty choice is [`Expr::Reject`]
    Choice(Vec<Expr>),
    /// `expr{min,max}`; `max` of `None` is unbounded
    Repeat {
        /// Repeated expression
        expr: Box<Expr>,
        /// Minimum count
        min: u32,
        /// Maximum count
        max: Option<u32>,
    },
}

impl Expr {
    /// Wrap in a repetition unless the bounds are `{1,1}`
    pub fn repeat(self, min: u32, max: Option<u32>) -> Expr {
        if min == 1 && max == Some(1) {
            return self;
        }
        if max == Some(0) {
            return Expr::Empty;
        }
        Expr::Repeat {
            expr: Box::new(self),
            min,
            max,
        }
    }

    /// Number of positions the expression unrolls to, saturating, with
    /// every repetition unrolled
    pub fn position_count(&self) -> usize {
        match self {
            Expr::Empty | Expr::Reject => 0,
            Expr::Leaf(_) => 1,
            Expr::Seq(items) | Expr::Choice(items) => items
                .iter()
                .fold(0usize, |n, e| n.saturating_add(e.position_count())),
            Expr::Repeat { expr, min, max } => {
                let copies = match max {
                    Some(max) => *max as usize,
                    None => (*min as usize).max(1),
                };
                expr.position_count().saturating_mul(copies)
            }
        }
    }
}

/// Number of positions `expr` takes under `limits`, with counted
/// repetitions taking one
fn positions_under(expr: &Expr, limits: &Limits) -> usize {
    match expr {
        Expr::Empty | Expr::Reject => 0,
        Expr::Leaf(_) => 1,
        Expr::Seq(items) | Expr::Choice(items) => items
            .iter()
            .fold(0usize, |n, e| n.saturating_add(positions_under(e, limits))),
        Expr::Repeat { expr, min, max } => {
            let copies = copies(*min, *max);
            if counted(expr, copies, limits) {
                1
            } else {
                positions_under(expr, limits).saturating_mul(copies)
            }
        }
    }
}

fn copies(min: u32, max: Option<u32>) -> usize {
    match max {
        Some(max) => max as usize,
        None => (min as usize).max(1),
    }
}

fn counted(expr: &Expr, copies: usize, limits: &Limits) -> bool {
    matches!(expr, Expr::Leaf(_)) && copies > limits.max_unrolled_occurs
}

/// Occurrence bounds shared by a group of positions
///
/// The positions follow one another; a run of consecutive matches inside the
/// group must number between `min` and `max`. Substitution expansion adds the
/// member copies of a counted head to its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    /// Positions counted together
    pub positions: BTreeSet<usize>,
    /// Fewest matches before leaving the group
    pub min: u32,
    /// Most matches; `None` is unbounded
    pub max: Option<u32>,
}

/// Position automaton of an expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Glushkov {
    /// Symbol of each position
    pub positions: Vec<Symbol>,
    /// Positions that can start a match
    pub first: BTreeSet<usize>,
    /// Positions that can end a match
    pub last: BTreeSet<usize>,
    /// Positions that can follow each position
    pub follow: Vec<BTreeSet<usize>>,
    /// Whether the empty sequence is accepted
    pub nullable: bool,
    /// Counted repetitions
    pub counters: Vec<Counter>,
}

impl Glushkov {
    /// Whether the automaton accepts nothing at all
    pub fn rejects_all(&self) -> bool {
        !self.nullable && self.first.is_empty()
    }

    /// Counter whose group holds position `p`
    pub fn counter_of(&self, p: usize) -> Option<&Counter> {
        self.counters.iter().find(|c| c.positions.contains(&p))
    }

    fn push(&mut self, symbol: Symbol) -> usize {
        self.positions.push(symbol);
        self.follow.push(BTreeSet::new());
        self.positions.len() - 1
    }

    fn link(&mut self, from: &BTreeSet<usize>, to: &BTreeSet<usize>) {
        for p in from {
            self.follow[*p].extend(to.iter().copied());
        }
    }
}

/// `first`, `last` and nullability of a sub-expression
#[derive(Debug, Clone, Default)]
struct Part {
    nullable: bool,
    first: BTreeSet<usize>,
    last: BTreeSet<usize>,
}

impl Part {
    fn empty() -> Self {
        Part {
            nullable: true,
            ..Part::default()
        }
    }

    fn reject() -> Self {
        Part::default()
    }
}

/// Sequence `a b`, linking `a.last` to `b.first`
fn seq(g: &mut Glushkov, a: Part, b: Part) -> Part {
    g.link(&a.last, &b.first);
    let mut first = a.first;
    if a.nullable {
        first.extend(b.first.iter().copied());
    }
    let mut last = b.last;
    if b.nullable {
        last.extend(a.last.iter().copied());
    }
    Part {
        nullable: a.nullable && b.nullable,
        first,
        last,
    }
}

fn build(g: &mut Glushkov, expr: &Expr, limits: &Limits) -> Result<Part> {
    Ok(match expr {
        Expr::Empty => Part::empty(),
        Expr::Reject => Part::reject(),
        Expr::Leaf(symbol) => {
            limits.check_positions(g.positions.len() + 1)?;
            let p = g.push(symbol.clone());
            Part {
                nullable: false,
                first: BTreeSet::from([p]),
                last: BTreeSet::from([p]),
            }
        }
        Expr::Seq(items) => {
            let mut acc = Part::empty();
            for item in items {
                let part = build(g, item, limits)?;
                acc = seq(g, acc, part);
            }
            acc
        }
        Expr::Choice(items) => {
            let mut acc = Part::reject();
            for item in items {
                let part = build(g, item, limits)?;
                acc.nullable |= part.nullable;
                acc.first.extend(part.first);
                acc.last.extend(part.last);
            }
            acc
        }
        Expr::Repeat { expr, min, max } => {
            let required = *min as usize;
            let copies = copies(*min, *max);
            if counted(expr, copies, limits) {
                let mut part = build(g, expr, limits)?;
                let p = g.positions.len() - 1;
                g.follow[p].insert(p);
                g.counters.push(Counter {
                    positions: BTreeSet::from([p]),
                    min: *min,
                    max: *max,
                });
                part.nullable = required == 0;
                return Ok(part);
            }
            if positions_under(expr, limits)
                .saturating_mul(copies)
                .saturating_add(g.positions.len())
                > limits.max_positions
            {
                return Err(Error::LimitExceeded(format!(
                    "content model unrolls to more than {} positions",
                    limits.max_positions
                )));
            }
            let mut parts = Vec::with_capacity(copies);
            for _ in 0..copies {
                parts.push(build(g, expr, limits)?);
            }
            match max {
                None => {
                    // the last copy loops on itself
                    if let Some(looped) = parts.last_mut() {
                        let (last, first) = (looped.last.clone(), looped.first.clone());
                        if let Some(c) = last
                            .intersection(&first)
                            .find_map(|p| g.counter_of(*p))
                        {
                            return Err(Error::LimitExceeded(format!(
                                "counted repetition {{{},{}}} cannot repeat without bound",
                                c.min,
                                c.max.map_or("unbounded".to_string(), |m| m.to_string())
                            )));
                        }
                        g.link(&last, &first);
                        if required == 0 {
                            looped.nullable = true;
                        }
                    }
                    let mut acc = Part::empty();
                    for part in parts {
                        acc = seq(g, acc, part);
                    }
                    acc
                }
                Some(_) => {
                    // optional copies nest from the inside out
                    let mut tail = Part::empty();
                    for (i, part) in parts.into_iter().enumerate().rev() {
                        tail = seq(g, part, tail);
                        if i >= required {
                            tail.nullable = true;
                        }
                    }
                    tail
                }
            }
        }
    })
}

/// Build the position automaton of an expression
pub fn build_glushkov(expr: &Expr, limits: &Limits) -> Result<Glushkov> {
    let mut g = Glushkov::default();
    let part = build(&mut g, expr, limits)?;
    g.first = part.first;
    g.last = part.last;
    g.nullable = part.nullable;
    Ok(g)
}
