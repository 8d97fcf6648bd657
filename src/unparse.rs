//! # Unparsing programs
//!
//! This module provides serialization for derived programs, both as SMT-LIB
//! S-expressions and as JSON.

use crate::grammar::*;
use crate::problem::Problem;
use crate::tree::*;

use serde::Serialize;

/// A program as an expression tree; holes are kept as their nonterminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Expr {
    Hole { hole: Nonterminal },
    App { label: String, args: Vec<Expr> },
}

impl Expr {
    pub fn of(program: &Program) -> Self {
        Self::at(program, ROOT)
    }

    fn at(program: &Program, id: NodeId) -> Self {
        let node = program.node(id);
        match &node.production {
            None => Expr::Hole {
                hole: node.nonterminal().clone(),
            },
            Some(p) => Expr::App {
                label: p.label.clone(),
                args: program
                    .args(id)
                    .into_iter()
                    .map(|c| Self::at(program, c))
                    .collect(),
            },
        }
    }

    pub fn sexp(&self) -> String {
        match self {
            Expr::Hole { hole } => format!("?{}", hole),
            Expr::App { label, args } if args.is_empty() => label.clone(),
            Expr::App { label, args } => format!(
                "({} {})",
                label,
                args.iter().map(|a| a.sexp()).collect::<Vec<_>>().join(" ")
            ),
        }
    }
}

fn smtlib_sort(sort: Sort) -> &'static str {
    match sort {
        Sort::Bool => "Bool",
        Sort::Int => "Int",
        Sort::Str => "String",
    }
}

/// Serialize a program to an S-expression
pub fn sexp(program: &Program) -> String {
    Expr::of(program).sexp()
}

/// Serialize a program to JSON
pub fn json(program: &Program) -> Result<String, String> {
    serde_json::to_string(&Expr::of(program)).map_err(|e| e.to_string())
}

/// The program as an SMT-LIB function definition.
pub fn define_fun(problem: &Problem, program: &Program) -> String {
    format!(
        "(define-fun {} ({}) {} {})",
        problem.signature.name,
        problem
            .inputs()
            .iter()
            .map(|(x, s)| format!("({} {})", x, smtlib_sort(*s)))
            .collect::<Vec<_>>()
            .join(" "),
        smtlib_sort(problem.signature.ret),
        sexp(program)
    )
}
