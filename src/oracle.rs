//! # Satisfiability oracles
//!
//! This module defines the interface the search uses to talk to a
//! satisfiability solver, but not how queries are decided, which is the job
//! of an oracle backend (see [`crate::smt`] and [`crate::bundled`]).
//!
//! Oracles are incremental: formulas are asserted into a stack of scopes, and
//! each check may add assumptions that hold for that check only. After an
//! unsatisfiable check, the unsat core is a subset of the assumptions that is
//! unsatisfiable together with the asserted scopes.

use crate::logic::Formula;

use serde::Serialize;

/// The answers an oracle may give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// The answers to a validity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Validity {
    Valid,
    Invalid,
    Unknown,
}

/// Incremental satisfiability oracles.
pub trait Oracle {
    fn name(&self) -> &'static str;

    /// Assert formulas into the innermost scope.
    fn assert(&mut self, formulas: &[Formula]);

    fn push(&mut self);

    /// Discard the innermost scope. Panics if there is none.
    fn pop(&mut self);

    /// Check the asserted scopes together with `assumptions`.
    fn check_sat(&mut self, assumptions: &[Formula]) -> SatResult;

    /// The unsat core of the last check, if it was unsatisfiable.
    fn unsat_core(&self) -> Vec<Formula>;

    /// Check a set of formulas in a fresh scope.
    fn satisfiable(&mut self, formulas: &[Formula]) -> SatResult {
        self.push();
        self.assert(formulas);
        let result = self.check_sat(&[]);
        self.pop();
        result
    }

    /// Check whether the asserted scopes and `premises` entail `conclusion`.
    fn valid(&mut self, premises: &[Formula], conclusion: &Formula) -> Validity {
        self.push();
        self.assert(premises);
        self.assert(&[Formula::not(conclusion.clone())]);
        let result = self.check_sat(&[]);
        self.pop();
        match result {
            SatResult::Unsat => Validity::Valid,
            SatResult::Sat => Validity::Invalid,
            SatResult::Unknown => Validity::Unknown,
        }
    }
}

/// A scope stack of asserted formulas, for backends that re-solve from
/// scratch on every check.
#[derive(Debug, Clone)]
pub struct Scopes(Vec<Vec<Formula>>);

impl Scopes {
    pub fn new() -> Self {
        Scopes(vec![vec![]])
    }

    pub fn assert(&mut self, formulas: &[Formula]) {
        if let Some(top) = self.0.last_mut() {
            top.extend(formulas.iter().cloned())
        }
    }

    pub fn push(&mut self) {
        self.0.push(vec![])
    }

    pub fn pop(&mut self) {
        assert!(self.0.len() > 1, "pop without matching push");
        self.0.pop();
    }

    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    pub fn formulas(&self) -> impl Iterator<Item = &Formula> {
        self.0.iter().flatten()
    }
}
