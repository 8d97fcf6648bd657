//! # Z3 oracle
//!
//! The default oracle, backed by an incremental [`z3::Solver`]. Scopes map
//! directly onto solver scopes. Each assumption of a check is guarded by a
//! fresh boolean literal and the guards are passed to `check_assumptions`, so
//! the unsat core reported by Z3 maps back to a subset of the assumptions.

use crate::logic::*;
use crate::oracle::*;

use std::collections::HashMap;
use z3::ast::{Bool, Int};
use z3::{Params, Solver};

fn term(t: &Term) -> Int {
    match t {
        Term::Var(s) => Int::new_const(s.0.clone()),
        Term::Const(n) => Int::from_i64(*n),
        Term::Add(a, b) => term(a) + term(b),
        Term::Sub(a, b) => term(a) - term(b),
    }
}

fn formula(f: &Formula) -> Bool {
    let nary = |gs: &[Formula], and: bool| {
        let gs = gs.iter().map(formula).collect::<Vec<_>>();
        let refs = gs.iter().collect::<Vec<_>>();
        if and {
            Bool::and(&refs)
        } else {
            Bool::or(&refs)
        }
    };
    match f {
        Formula::True => Bool::from_bool(true),
        Formula::False => Bool::from_bool(false),
        Formula::Choice(c) => Bool::new_const(c.to_string()),
        Formula::Eq(a, b) => {
            let (a, b) = (term(a), term(b));
            Bool::and(&[&a.le(&b), &a.ge(&b)])
        }
        Formula::Lt(a, b) => term(a).lt(&term(b)),
        Formula::Le(a, b) => term(a).le(&term(b)),
        Formula::Not(g) => formula(g).not(),
        Formula::And(gs) if gs.is_empty() => Bool::from_bool(true),
        Formula::And(gs) => nary(gs, true),
        Formula::Or(gs) if gs.is_empty() => Bool::from_bool(false),
        Formula::Or(gs) => nary(gs, false),
    }
}

/// The Z3 oracle.
pub struct Z3 {
    solver: Solver,
    depth: usize,
    core: Vec<Formula>,
}

impl Z3 {
    /// A fresh solver; `timeout_ms` bounds each individual check.
    pub fn new(timeout_ms: Option<u64>) -> Self {
        let solver = Solver::new();
        let mut params = Params::new();
        params.set_bool("core.minimize", true);
        if let Some(ms) = timeout_ms {
            params.set_u32("timeout", u32::try_from(ms).unwrap_or(u32::MAX));
        }
        solver.set_params(&params);
        Self {
            solver,
            depth: 0,
            core: vec![],
        }
    }
}

impl Oracle for Z3 {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn assert(&mut self, formulas: &[Formula]) {
        for f in formulas {
            self.solver.assert(&formula(f));
        }
    }

    fn push(&mut self) {
        self.solver.push();
        self.depth += 1;
    }

    fn pop(&mut self) {
        assert!(self.depth > 0, "pop without matching push");
        self.solver.pop(1);
        self.depth -= 1;
    }

    fn check_sat(&mut self, assumptions: &[Formula]) -> SatResult {
        self.core = vec![];

        self.solver.push();
        let mut guards = Vec::with_capacity(assumptions.len());
        let mut by_name = HashMap::new();
        for (i, f) in assumptions.iter().enumerate() {
            let name = format!("assume_{}", i);
            let guard = Bool::new_const(name.clone());
            self.solver.assert(&guard.implies(&formula(f)));
            guards.push(guard);
            by_name.insert(name, f);
        }

        let result = match self.solver.check_assumptions(&guards) {
            z3::SatResult::Sat => SatResult::Sat,
            z3::SatResult::Unsat => {
                self.core = self
                    .solver
                    .get_unsat_core()
                    .iter()
                    .filter_map(|g| by_name.get(&g.to_string()))
                    .map(|f| (*f).clone())
                    .collect();
                SatResult::Unsat
            }
            z3::SatResult::Unknown => {
                log::debug!(
                    "z3 unknown: {}",
                    self.solver.get_reason_unknown().unwrap_or_default()
                );
                SatResult::Unknown
            }
        };
        self.solver.pop(1);
        result
    }

    fn unsat_core(&self) -> Vec<Formula> {
        self.core.clone()
    }
}
