//! # Constraint logic
//!
//! This module defines the quantifier-free formulas that the search exchanges
//! with a satisfiability oracle: linear integer (in)equalities over feature
//! symbols, combined with boolean structure and `choice(node, production)`
//! atoms recording which production a tree node derives.

use crate::tree::NodeId;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

////////////////////////////////////////////////////////////////////////////////
// Atoms

/// The type of integer-valued symbols, e.g. `n3.len` or `in.name.first`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The part of the symbol before the final `.`, if any.
    pub fn owner(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(o, _)| o)
    }

    /// The part of the symbol after the final `.`.
    pub fn feature(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((_, f)) => f,
            None => &self.0,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The proposition "node `node` is derived with the production labeled
/// `label`".
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
pub struct Choice {
    pub node: NodeId,
    pub label: String,
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "choice({}, {})", self.node, self.label)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Terms

/// Integer terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Term {
    Var(Symbol),
    Const(i64),
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
}

impl Term {
    pub fn var(s: impl Into<String>) -> Self {
        Term::Var(Symbol::new(s))
    }

    pub fn rename(&self, f: &impl Fn(&Symbol) -> Symbol) -> Term {
        match self {
            Term::Var(s) => Term::Var(f(s)),
            Term::Const(n) => Term::Const(*n),
            Term::Add(a, b) => {
                Term::Add(Box::new(a.rename(f)), Box::new(b.rename(f)))
            }
            Term::Sub(a, b) => {
                Term::Sub(Box::new(a.rename(f)), Box::new(b.rename(f)))
            }
        }
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Term::Var(s) => {
                out.insert(s.clone());
            }
            Term::Const(_) => (),
            Term::Add(a, b) | Term::Sub(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }

    /// The term as `Σ cᵢ·xᵢ + k`, with zero coefficients dropped. Wide
    /// arithmetic keeps sums of `i64` constants exact.
    pub fn linear(&self) -> (BTreeMap<Symbol, i128>, i128) {
        let mut coeffs = BTreeMap::new();
        let mut constant = 0;
        self.accumulate(1, &mut coeffs, &mut constant);
        coeffs.retain(|_, c| *c != 0);
        (coeffs, constant)
    }

    fn accumulate(
        &self,
        sign: i128,
        coeffs: &mut BTreeMap<Symbol, i128>,
        constant: &mut i128,
    ) {
        match self {
            Term::Var(s) => *coeffs.entry(s.clone()).or_insert(0) += sign,
            Term::Const(n) => *constant += sign * *n as i128,
            Term::Add(a, b) => {
                a.accumulate(sign, coeffs, constant);
                b.accumulate(sign, coeffs, constant);
            }
            Term::Sub(a, b) => {
                a.accumulate(sign, coeffs, constant);
                b.accumulate(-sign, coeffs, constant);
            }
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Var(s) => write!(f, "{}", s),
            Term::Const(n) => write!(f, "{}", n),
            Term::Add(a, b) => write!(f, "{} + {}", a, b),
            Term::Sub(a, b) => match **b {
                Term::Add(..) | Term::Sub(..) => write!(f, "{} - ({})", a, b),
                _ => write!(f, "{} - {}", a, b),
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Formulas

/// Quantifier-free formulas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Formula {
    True,
    False,
    Choice(Choice),
    Eq(Term, Term),
    Lt(Term, Term),
    Le(Term, Term),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    pub fn choice(node: NodeId, label: &str) -> Self {
        Formula::Choice(Choice {
            node,
            label: label.to_owned(),
        })
    }

    pub fn not(f: Formula) -> Self {
        match f {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(g) => *g,
            _ => Formula::Not(Box::new(f)),
        }
    }

    /// Create a conjunction, flattening nested conjunctions.
    pub fn and(fs: impl IntoIterator<Item = Formula>) -> Self {
        let mut conjuncts = vec![];
        for f in fs {
            match f {
                Formula::True => (),
                Formula::False => return Formula::False,
                Formula::And(gs) => conjuncts.extend(gs),
                _ => conjuncts.push(f),
            }
        }
        match conjuncts.len() {
            0 => Formula::True,
            1 => conjuncts.remove(0),
            _ => Formula::And(conjuncts),
        }
    }

    /// Create a disjunction, flattening nested disjunctions.
    pub fn or(fs: impl IntoIterator<Item = Formula>) -> Self {
        let mut disjuncts = vec![];
        for f in fs {
            match f {
                Formula::False => (),
                Formula::True => return Formula::True,
                Formula::Or(gs) => disjuncts.extend(gs),
                _ => disjuncts.push(f),
            }
        }
        match disjuncts.len() {
            0 => Formula::False,
            1 => disjuncts.remove(0),
            _ => Formula::Or(disjuncts),
        }
    }

    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Self::or([Self::not(premise), conclusion])
    }

    pub fn rename(&self, f: &impl Fn(&Symbol) -> Symbol) -> Formula {
        match self {
            Formula::True | Formula::False | Formula::Choice(_) => self.clone(),
            Formula::Eq(a, b) => Formula::Eq(a.rename(f), b.rename(f)),
            Formula::Lt(a, b) => Formula::Lt(a.rename(f), b.rename(f)),
            Formula::Le(a, b) => Formula::Le(a.rename(f), b.rename(f)),
            Formula::Not(g) => Formula::Not(Box::new(g.rename(f))),
            Formula::And(gs) => {
                Formula::And(gs.iter().map(|g| g.rename(f)).collect())
            }
            Formula::Or(gs) => {
                Formula::Or(gs.iter().map(|g| g.rename(f)).collect())
            }
        }
    }

    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect(&mut out, &mut BTreeSet::new());
        out
    }

    pub fn choices(&self) -> BTreeSet<Choice> {
        let mut out = BTreeSet::new();
        self.collect(&mut BTreeSet::new(), &mut out);
        out
    }

    fn collect(
        &self,
        symbols: &mut BTreeSet<Symbol>,
        choices: &mut BTreeSet<Choice>,
    ) {
        match self {
            Formula::True | Formula::False => (),
            Formula::Choice(c) => {
                choices.insert(c.clone());
            }
            Formula::Eq(a, b) | Formula::Lt(a, b) | Formula::Le(a, b) => {
                a.collect_symbols(symbols);
                b.collect_symbols(symbols);
            }
            Formula::Not(g) => g.collect(symbols, choices),
            Formula::And(gs) | Formula::Or(gs) => {
                for g in gs {
                    g.collect(symbols, choices)
                }
            }
        }
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |f: &mut std::fmt::Formatter<'_>, gs: &[Formula], sep: &str| {
            write!(f, "(")?;
            for (i, g) in gs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", g)?;
            }
            write!(f, ")")
        };
        match self {
            Formula::True => write!(f, "⊤"),
            Formula::False => write!(f, "⊥"),
            Formula::Choice(c) => write!(f, "{}", c),
            Formula::Eq(a, b) => write!(f, "{} = {}", a, b),
            Formula::Lt(a, b) => write!(f, "{} < {}", a, b),
            Formula::Le(a, b) => write!(f, "{} <= {}", a, b),
            Formula::Not(g) => match **g {
                Formula::Eq(..) | Formula::Lt(..) | Formula::Le(..) => {
                    write!(f, "¬({})", g)
                }
                _ => write!(f, "¬{}", g),
            },
            Formula::And(gs) => join(f, &gs[..], "∧"),
            Formula::Or(gs) => join(f, &gs[..], "∨"),
        }
    }
}
