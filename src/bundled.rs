//! # Bundled oracle
//!
//! A self-contained decision procedure for the formulas the search produces:
//! boolean combinations of choice atoms and linear integer constraints. It is
//! the fallback for builds without Z3 (notably WebAssembly).
//!
//! Formulas are converted to clauses (Tseitin), the boolean structure is
//! searched by DPLL with unit propagation, and the arithmetic literals of a
//! branch are checked by interval propagation over unbounded integers. Once
//! every clause is satisfied, the arithmetic literals are decided by
//! bisection. Symbols that propagation leaves unbounded are searched within a
//! window of `bound` around their known side; an unsatisfiable answer that
//! relied on such a window is reported as [`SatResult::Unknown`], as is
//! exceeding the node budget.
//!
//! Unsat cores are minimal: assumptions are dropped one at a time as long as
//! the rest stays unsatisfiable.

use crate::logic::*;
use crate::oracle::*;

use indexmap::IndexMap;
use std::collections::HashMap;

////////////////////////////////////////////////////////////////////////////////
// Configuration

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Width of the window searched for symbols with no derived bound.
    pub bound: i64,
    /// Search nodes allowed per check before giving up.
    pub node_budget: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bound: 4096,
            node_budget: 200_000,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Clausal form

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Rel {
    Eq,
    Le,
}

/// `Σ cᵢ·xᵢ + constant (= | <=) 0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Linear {
    coeffs: Vec<(usize, i128)>,
    constant: i128,
    rel: Rel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Atom {
    Choice(Choice),
    Linear(Linear),
    Aux(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lit {
    atom: usize,
    positive: bool,
}

impl Lit {
    fn negate(self) -> Lit {
        Lit {
            atom: self.atom,
            positive: !self.positive,
        }
    }
}

enum Encoded {
    Const(bool),
    Lit(Lit),
}

#[derive(Debug, Default)]
struct Instance {
    atoms: Vec<Atom>,
    index: HashMap<Atom, usize>,
    clauses: Vec<Vec<Lit>>,
    vars: IndexMap<Symbol, usize>,
    aux: usize,
}

impl Instance {
    fn build<'a>(formulas: impl IntoIterator<Item = &'a Formula>) -> Self {
        let mut inst = Self::default();
        for f in formulas {
            inst.add_root(f);
        }
        inst
    }

    fn atom(&mut self, a: Atom) -> usize {
        if let Some(i) = self.index.get(&a) {
            return *i;
        }
        let i = self.atoms.len();
        self.index.insert(a.clone(), i);
        self.atoms.push(a);
        i
    }

    fn var(&mut self, s: &Symbol) -> usize {
        let next = self.vars.len();
        *self.vars.entry(s.clone()).or_insert(next)
    }

    fn fresh(&mut self) -> Lit {
        self.aux += 1;
        let atom = self.atom(Atom::Aux(self.aux));
        Lit {
            atom,
            positive: true,
        }
    }

    fn linear(&mut self, lhs: &Term, rhs: &Term, shift: i128, rel: Rel) -> Encoded {
        let (mut coeffs, lk) = lhs.linear();
        let (rcoeffs, rk) = rhs.linear();
        for (s, c) in rcoeffs {
            *coeffs.entry(s).or_insert(0) -= c;
        }
        coeffs.retain(|_, c| *c != 0);
        let constant = lk - rk + shift;

        if coeffs.is_empty() {
            return Encoded::Const(match rel {
                Rel::Eq => constant == 0,
                Rel::Le => constant <= 0,
            });
        }

        let mut coeffs: Vec<(usize, i128)> =
            coeffs.iter().map(|(s, c)| (self.var(s), *c)).collect();
        coeffs.sort();
        let mut constant = constant;
        if rel == Rel::Eq && coeffs[0].1 < 0 {
            for (_, c) in coeffs.iter_mut() {
                *c = -*c;
            }
            constant = -constant;
        }

        let atom = self.atom(Atom::Linear(Linear {
            coeffs,
            constant,
            rel,
        }));
        Encoded::Lit(Lit {
            atom,
            positive: true,
        })
    }

    fn encode(&mut self, f: &Formula) -> Encoded {
        match f {
            Formula::True => Encoded::Const(true),
            Formula::False => Encoded::Const(false),
            Formula::Choice(c) => Encoded::Lit(Lit {
                atom: self.atom(Atom::Choice(c.clone())),
                positive: true,
            }),
            Formula::Eq(a, b) => self.linear(a, b, 0, Rel::Eq),
            Formula::Lt(a, b) => self.linear(a, b, 1, Rel::Le),
            Formula::Le(a, b) => self.linear(a, b, 0, Rel::Le),
            Formula::Not(g) => match self.encode(g) {
                Encoded::Const(b) => Encoded::Const(!b),
                Encoded::Lit(l) => Encoded::Lit(l.negate()),
            },
            Formula::And(gs) => self.gate(gs, true),
            Formula::Or(gs) => self.gate(gs, false),
        }
    }

    fn gate(&mut self, gs: &[Formula], conjunction: bool) -> Encoded {
        let mut lits = vec![];
        for g in gs {
            match self.encode(g) {
                Encoded::Const(b) if b == conjunction => (),
                Encoded::Const(b) => return Encoded::Const(b),
                Encoded::Lit(l) => lits.push(l),
            }
        }
        if lits.is_empty() {
            return Encoded::Const(conjunction);
        }
        if lits.len() == 1 {
            return Encoded::Lit(lits[0]);
        }

        let out = self.fresh();
        if conjunction {
            for l in &lits {
                self.clauses.push(vec![out.negate(), *l]);
            }
            let mut clause = vec![out];
            clause.extend(lits.iter().map(|l| l.negate()));
            self.clauses.push(clause);
        } else {
            for l in &lits {
                self.clauses.push(vec![out, l.negate()]);
            }
            let mut clause = vec![out.negate()];
            clause.extend(lits.iter().copied());
            self.clauses.push(clause);
        }
        Encoded::Lit(out)
    }

    fn add_root(&mut self, f: &Formula) {
        match f {
            Formula::And(gs) => {
                for g in gs {
                    self.add_root(g)
                }
            }
            Formula::Or(gs) => {
                let mut clause = vec![];
                for g in gs {
                    match self.encode(g) {
                        Encoded::Const(true) => return,
                        Encoded::Const(false) => (),
                        Encoded::Lit(l) => clause.push(l),
                    }
                }
                self.clauses.push(clause);
            }
            _ => match self.encode(f) {
                Encoded::Const(true) => (),
                Encoded::Const(false) => self.clauses.push(vec![]),
                Encoded::Lit(l) => self.clauses.push(vec![l]),
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Integer reasoning

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Le,
    Ne,
}

#[derive(Debug, Clone)]
struct Constraint {
    coeffs: Vec<(usize, i128)>,
    constant: i128,
    cmp: Cmp,
}

impl Constraint {
    fn from_literal(lin: &Linear, positive: bool) -> Self {
        match (lin.rel, positive) {
            (Rel::Eq, true) => Self {
                coeffs: lin.coeffs.clone(),
                constant: lin.constant,
                cmp: Cmp::Eq,
            },
            (Rel::Eq, false) => Self {
                coeffs: lin.coeffs.clone(),
                constant: lin.constant,
                cmp: Cmp::Ne,
            },
            (Rel::Le, true) => Self {
                coeffs: lin.coeffs.clone(),
                constant: lin.constant,
                cmp: Cmp::Le,
            },
            // ¬(e <= 0) is -e + 1 <= 0
            (Rel::Le, false) => Self {
                coeffs: lin.coeffs.iter().map(|(i, c)| (*i, -c)).collect(),
                constant: 1 - lin.constant,
                cmp: Cmp::Le,
            },
        }
    }

    /// The value of the left-hand side, if every symbol is fixed.
    fn value(&self, bounds: &Bounds) -> Option<i128> {
        let mut v = self.constant;
        for (i, c) in &self.coeffs {
            v += c * bounds.fixed(*i)?;
        }
        Some(v)
    }

    fn holds(&self, bounds: &Bounds) -> bool {
        match (self.value(bounds), self.cmp) {
            (Some(v), Cmp::Eq) => v == 0,
            (Some(v), Cmp::Le) => v <= 0,
            (Some(v), Cmp::Ne) => v != 0,
            (None, _) => false,
        }
    }
}

fn floor_div(a: i128, b: i128) -> i128 {
    let d = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        d - 1
    } else {
        d
    }
}

fn ceil_div(a: i128, b: i128) -> i128 {
    -floor_div(-a, b)
}

/// Interval domains of the integer symbols; `None` is unbounded.
#[derive(Debug, Clone)]
struct Bounds {
    lo: Vec<Option<i128>>,
    hi: Vec<Option<i128>>,
}

impl Bounds {
    fn new(n: usize) -> Self {
        Self {
            lo: vec![None; n],
            hi: vec![None; n],
        }
    }

    fn fixed(&self, i: usize) -> Option<i128> {
        match (self.lo[i], self.hi[i]) {
            (Some(l), Some(h)) if l == h => Some(l),
            _ => None,
        }
    }

    fn empty(&self, i: usize) -> bool {
        matches!((self.lo[i], self.hi[i]), (Some(l), Some(h)) if l > h)
    }

    fn min_term(&self, c: i128, i: usize) -> Option<i128> {
        if c > 0 {
            self.lo[i].map(|l| c * l)
        } else {
            self.hi[i].map(|h| c * h)
        }
    }

    /// Tighten with `sign·(Σ cᵢ·xᵢ + k) <= 0`; false if infeasible.
    fn tighten_le(&mut self, c: &Constraint, sign: i128, changed: &mut bool) -> bool {
        let terms: Vec<Option<i128>> = c
            .coeffs
            .iter()
            .map(|(i, ci)| self.min_term(sign * ci, *i))
            .collect();
        let known: i128 =
            terms.iter().flatten().sum::<i128>() + sign * c.constant;
        let unbounded = terms.iter().filter(|t| t.is_none()).count();
        if unbounded == 0 && known > 0 {
            return false;
        }
        for ((i, ci), term) in c.coeffs.iter().zip(&terms) {
            // The minimum of every other term, when it is finite.
            let rest = match (unbounded, term) {
                (0, Some(t)) => known - t,
                (1, None) => known,
                _ => continue,
            };
            let ci = sign * ci;
            if ci > 0 {
                let ub = floor_div(-rest, ci);
                if self.hi[*i].map_or(true, |h| ub < h) {
                    self.hi[*i] = Some(ub);
                    *changed = true;
                }
            } else {
                let lb = ceil_div(-rest, ci);
                if self.lo[*i].map_or(true, |l| lb > l) {
                    self.lo[*i] = Some(lb);
                    *changed = true;
                }
            }
            if self.empty(*i) {
                return false;
            }
        }
        true
    }

    fn exclude(&mut self, c: &Constraint, changed: &mut bool) -> bool {
        let unfixed: Vec<&(usize, i128)> = c
            .coeffs
            .iter()
            .filter(|(i, _)| self.fixed(*i).is_none())
            .collect();
        match unfixed.as_slice() {
            [] => c.value(self) != Some(0),
            [(j, cj)] => {
                let rest: i128 = c
                    .coeffs
                    .iter()
                    .filter(|(i, _)| i != j)
                    .filter_map(|(i, ci)| self.fixed(*i).map(|v| ci * v))
                    .sum::<i128>()
                    + c.constant;
                if (-rest) % cj == 0 {
                    let v = -rest / cj;
                    if self.lo[*j] == Some(v) {
                        self.lo[*j] = Some(v + 1);
                        *changed = true;
                    } else if self.hi[*j] == Some(v) {
                        self.hi[*j] = Some(v - 1);
                        *changed = true;
                    }
                }
                !self.empty(*j)
            }
            _ => true,
        }
    }

    /// Propagate bounds to a fixpoint (or a round limit); false if
    /// infeasible.
    fn propagate(&mut self, constraints: &[Constraint]) -> bool {
        const MAX_ROUNDS: usize = 64;
        for _ in 0..MAX_ROUNDS {
            let mut changed = false;
            for c in constraints {
                let ok = match c.cmp {
                    Cmp::Le => self.tighten_le(c, 1, &mut changed),
                    Cmp::Eq => {
                        self.tighten_le(c, 1, &mut changed)
                            && self.tighten_le(c, -1, &mut changed)
                    }
                    Cmp::Ne => self.exclude(c, &mut changed),
                };
                if !ok {
                    return false;
                }
            }
            if !changed {
                break;
            }
        }
        true
    }
}

////////////////////////////////////////////////////////////////////////////////
// Search

struct Exhausted;

struct Solver<'a> {
    inst: &'a Instance,
    config: Config,
    spent: usize,
    /// Some symbol was searched within an artificial window.
    windowed: bool,
}

impl Solver<'_> {
    fn spend(&mut self) -> Result<(), Exhausted> {
        self.spent += 1;
        if self.spent > self.config.node_budget {
            Err(Exhausted)
        } else {
            Ok(())
        }
    }

    /// Assign unit literals until fixpoint; false on a falsified clause.
    fn unit_propagate(&self, assign: &mut [Option<bool>]) -> bool {
        loop {
            let mut changed = false;
            for clause in &self.inst.clauses {
                let mut open = None;
                let mut open_count = 0;
                let mut satisfied = false;
                for l in clause {
                    match assign[l.atom] {
                        Some(v) if v == l.positive => {
                            satisfied = true;
                            break;
                        }
                        Some(_) => (),
                        None => {
                            open_count += 1;
                            open = Some(*l);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (open_count, open) {
                    (0, _) => return false,
                    (1, Some(l)) => {
                        assign[l.atom] = Some(l.positive);
                        changed = true;
                    }
                    _ => (),
                }
            }
            if !changed {
                return true;
            }
        }
    }

    /// An open literal of the first clause that is not yet satisfied.
    fn branch_literal(&self, assign: &[Option<bool>]) -> Option<Lit> {
        for clause in &self.inst.clauses {
            let satisfied = clause
                .iter()
                .any(|l| assign[l.atom] == Some(l.positive));
            if satisfied {
                continue;
            }
            if let Some(l) = clause.iter().find(|l| assign[l.atom].is_none()) {
                return Some(*l);
            }
        }
        None
    }

    fn constraints(&self, assign: &[Option<bool>]) -> Vec<Constraint> {
        self.inst
            .atoms
            .iter()
            .zip(assign)
            .filter_map(|(a, v)| match (a, v) {
                (Atom::Linear(lin), Some(positive)) => {
                    Some(Constraint::from_literal(lin, *positive))
                }
                _ => None,
            })
            .collect()
    }

    fn dpll(&mut self, mut assign: Vec<Option<bool>>) -> Result<bool, Exhausted> {
        self.spend()?;
        if !self.unit_propagate(&mut assign) {
            return Ok(false);
        }

        let constraints = self.constraints(&assign);
        let mut bounds = Bounds::new(self.inst.vars.len());
        if !bounds.propagate(&constraints) {
            return Ok(false);
        }

        match self.branch_literal(&assign) {
            None => self.bisect(&constraints, bounds),
            Some(lit) => {
                let mut first = assign.clone();
                first[lit.atom] = Some(lit.positive);
                if self.dpll(first)? {
                    return Ok(true);
                }
                assign[lit.atom] = Some(!lit.positive);
                self.dpll(assign)
            }
        }
    }

    /// Decide a conjunction of integer constraints, exactly when every
    /// symbol has derived bounds.
    fn bisect(
        &mut self,
        constraints: &[Constraint],
        mut bounds: Bounds,
    ) -> Result<bool, Exhausted> {
        self.spend()?;
        if !bounds.propagate(constraints) {
            return Ok(false);
        }

        let width = |b: &Bounds, i: usize| match (b.lo[i], b.hi[i]) {
            (Some(l), Some(h)) => (false, h - l),
            _ => (true, 0),
        };
        let pick = constraints
            .iter()
            .flat_map(|c| c.coeffs.iter().map(|(i, _)| *i))
            .filter(|i| bounds.fixed(*i).is_none())
            .min_by_key(|i| (width(&bounds, *i), *i));

        let Some(i) = pick else {
            return Ok(constraints.iter().all(|c| c.holds(&bounds)));
        };

        let window = 2 * self.config.bound as i128;
        let (lo, hi) = match (bounds.lo[i], bounds.hi[i]) {
            (Some(l), Some(h)) => (l, h),
            (Some(l), None) => (l, l + window),
            (None, Some(h)) => (h - window, h),
            (None, None) => (-window / 2, window / 2),
        };
        if (bounds.lo[i], bounds.hi[i]) != (Some(lo), Some(hi)) {
            self.windowed = true;
        }

        let mid = lo + (hi - lo) / 2;
        let mut lower = bounds.clone();
        lower.lo[i] = Some(lo);
        lower.hi[i] = Some(mid);
        if self.bisect(constraints, lower)? {
            return Ok(true);
        }
        bounds.lo[i] = Some(mid + 1);
        bounds.hi[i] = Some(hi);
        self.bisect(constraints, bounds)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Oracle

/// The bundled oracle.
#[derive(Debug, Clone)]
pub struct Bundled {
    config: Config,
    scopes: Scopes,
    core: Vec<Formula>,
}

impl Bundled {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scopes: Scopes::new(),
            core: vec![],
        }
    }

    fn solve(&self, formulas: &[&Formula]) -> SatResult {
        let inst = Instance::build(formulas.iter().copied());
        if inst.clauses.iter().any(|c| c.is_empty()) {
            return SatResult::Unsat;
        }
        let mut solver = Solver {
            inst: &inst,
            config: self.config,
            spent: 0,
            windowed: false,
        };
        match solver.dpll(vec![None; inst.atoms.len()]) {
            Ok(true) => SatResult::Sat,
            Ok(false) if solver.windowed => SatResult::Unknown,
            Ok(false) => SatResult::Unsat,
            Err(Exhausted) => SatResult::Unknown,
        }
    }

    fn minimize(&self, base: &[&Formula], assumptions: &[Formula]) -> Vec<Formula> {
        let mut core: Vec<&Formula> = assumptions.iter().collect();
        let mut i = 0;
        while i < core.len() {
            let mut trial = base.to_vec();
            trial.extend(
                core.iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, f)| *f),
            );
            if self.solve(&trial) == SatResult::Unsat {
                core.remove(i);
            } else {
                i += 1;
            }
        }
        core.into_iter().cloned().collect()
    }
}

impl Oracle for Bundled {
    fn name(&self) -> &'static str {
        "bundled"
    }

    fn assert(&mut self, formulas: &[Formula]) {
        self.scopes.assert(formulas)
    }

    fn push(&mut self) {
        self.scopes.push()
    }

    fn pop(&mut self) {
        self.scopes.pop()
    }

    fn check_sat(&mut self, assumptions: &[Formula]) -> SatResult {
        let base: Vec<&Formula> = self.scopes.formulas().collect();
        let mut all = base.clone();
        all.extend(assumptions.iter());

        let result = self.solve(&all);
        log::trace!(
            "bundled check: {} asserted, {} assumed => {:?}",
            base.len(),
            assumptions.len(),
            result
        );

        self.core = match result {
            SatResult::Unsat => self.minimize(&base, assumptions),
            _ => vec![],
        };
        result
    }

    fn unsat_core(&self) -> Vec<Formula> {
        self.core.clone()
    }
}
