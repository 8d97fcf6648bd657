//! # Semantic encoding
//!
//! This module translates partial programs into constraints over abstract
//! features. Strings are abstracted by their length and the codes of their
//! first and last characters; integers and booleans by their value.
//!
//! Each derived node contributes the templates of its production, renamed so
//! that `o.F` refers to the node's own features and `xI.F` to those of its
//! I-th child. Node feature symbols are `nID.F`, except that the root's are
//! `out.F`, which aliases the root to the program output. Holes contribute
//! nothing.

use crate::grammar::*;
use crate::logic::*;
use crate::problem::*;
use crate::semantics::{self, Semantics};
use crate::tree::*;

use std::collections::HashMap;

/// The first/last feature of the empty string.
pub const EMPTY_CHAR: i64 = -1;

////////////////////////////////////////////////////////////////////////////////
// Symbols and abstraction

pub fn node_symbol(id: NodeId, feature: &str) -> Symbol {
    if id == ROOT {
        Symbol(format!("out.{}", feature))
    } else {
        Symbol(format!("n{}.{}", id, feature))
    }
}

pub fn input_symbol(name: &str, feature: &str) -> Symbol {
    Symbol(format!("in.{}.{}", name, feature))
}

/// The abstract features of a concrete value.
pub fn abstract_value(v: &Value) -> Vec<(&'static str, i64)> {
    match v {
        Value::Str(s) => {
            let code = |c: Option<char>| c.map(|c| c as i64).unwrap_or(EMPTY_CHAR);
            vec![
                ("len", s.chars().count() as i64),
                ("first", code(s.chars().next())),
                ("last", code(s.chars().last())),
            ]
        }
        Value::Int(n) => vec![("val", *n)],
        Value::Bool(b) => vec![("val", *b as i64)],
    }
}

fn pin(symbol: Symbol, value: i64) -> Formula {
    Formula::Eq(Term::Var(symbol), Term::Const(value))
}

////////////////////////////////////////////////////////////////////////////////
// Program specifications

/// Where a clause of a program specification came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub node: NodeId,
    pub production: Production,
    /// The template the clause was instantiated from.
    pub generic: Formula,
}

/// The conjunction of the constraints of every derived node.
///
/// Each distinct clause appears once; a clause instantiated at several nodes
/// keeps the provenance of every one of them.
#[derive(Debug, Clone, Default)]
pub struct ProgramSpec {
    pub clauses: Vec<Formula>,
    provenance: Vec<Vec<Provenance>>,
    index: HashMap<Formula, usize>,
}

impl ProgramSpec {
    fn push(&mut self, clause: Formula, provenance: Provenance) {
        if let Some(i) = self.index.get(&clause) {
            self.provenance[*i].push(provenance);
            return;
        }
        self.index.insert(clause.clone(), self.clauses.len());
        self.clauses.push(clause);
        self.provenance.push(vec![provenance]);
    }

    /// Map a clause back to the nodes and productions that generated it.
    pub fn trace(&self, clause: &Formula) -> &[Provenance] {
        match self.index.get(clause) {
            Some(i) => &self.provenance[*i],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Encoding

/// Everything needed to encode programs of one problem.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub problem: &'a Problem,
    pub semantics: &'a Semantics,
}

impl<'a> Context<'a> {
    pub fn new(problem: &'a Problem, semantics: &'a Semantics) -> Self {
        Self { problem, semantics }
    }

    /// The generic templates of a production at a nonterminal.
    pub fn schema(
        &self,
        nt: &Nonterminal,
        production: &Production,
    ) -> Vec<Formula> {
        let sort = self.problem.sort(nt);
        let o = |f: &str| Symbol(format!("o.{}", f));

        let mut phis = match production.kind(self.problem.inputs()) {
            Label::Str(s) => abstract_value(&Value::Str(s))
                .into_iter()
                .map(|(f, v)| pin(o(f), v))
                .collect(),
            Label::Int(n) => vec![pin(o("val"), n)],
            Label::Bool(b) => vec![pin(o("val"), b as i64)],
            Label::Input(name) => {
                let input_sort = self.problem.inputs()[name];
                semantics::features(input_sort)
                    .iter()
                    .map(|f| {
                        Formula::Eq(
                            Term::Var(o(f)),
                            Term::Var(input_symbol(name, f)),
                        )
                    })
                    .collect()
            }
            Label::Operator(op) => match self.semantics.get(op) {
                Some(op) => op.templates.clone(),
                None => vec![],
            },
        };

        phis.extend(semantics::sort_axioms(sort));
        phis
    }

    /// Rename the generic symbols of a template to those of node `id`.
    pub fn instantiate(
        &self,
        program: &Program,
        id: NodeId,
        generic: &Formula,
    ) -> Formula {
        generic.rename(&|s: &Symbol| {
            let (owner, feature) = match s.0.split_once('.') {
                Some(parts) => parts,
                None => return s.clone(),
            };
            if owner == "o" {
                return node_symbol(id, feature);
            }
            match owner.strip_prefix('x').and_then(|i| i.parse::<usize>().ok())
            {
                Some(i) if i >= 1 => {
                    node_symbol(program.child_id(id, i - 1), feature)
                }
                _ => s.clone(),
            }
        })
    }

    /// The (generic, instantiated) constraints of a derived node.
    pub fn node_constraint(
        &self,
        program: &Program,
        id: NodeId,
    ) -> Vec<(Formula, Formula)> {
        let node = program.node(id);
        let production = match &node.production {
            Some(p) => p,
            None => return vec![],
        };
        self.schema(node.nonterminal(), production)
            .into_iter()
            .map(|g| {
                let inst = self.instantiate(program, id, &g);
                (g, inst)
            })
            .collect()
    }

    /// The program specification of a (partial) program.
    pub fn program_spec(&self, program: &Program) -> ProgramSpec {
        let mut spec = ProgramSpec::default();
        for node in program.filled() {
            let production = match &node.production {
                Some(p) => p,
                None => continue,
            };
            for (generic, clause) in self.node_constraint(program, node.id) {
                spec.push(
                    clause,
                    Provenance {
                        node: node.id,
                        production: production.clone(),
                        generic,
                    },
                );
            }
        }
        spec
    }

    /// The feature assignment of one example.
    pub fn example_constraint(&self, example: &Example) -> Vec<Formula> {
        let mut phis = vec![];
        for (name, v) in &example.inputs {
            for (f, n) in abstract_value(v) {
                phis.push(pin(input_symbol(name, f), n));
            }
        }
        for (f, n) in abstract_value(&example.output) {
            phis.push(pin(node_symbol(ROOT, f), n));
        }
        phis
    }
}
