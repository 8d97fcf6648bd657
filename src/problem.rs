//! # Synthesis problems
//!
//! A problem bundles a grammar with the signature of the function to
//! synthesize and the input/output examples it must satisfy. Problems are
//! written in TOML; see [`crate::parse::problem`].

use crate::grammar::*;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Values

/// The possible values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    pub fn sort(&self) -> Sort {
        match self {
            Value::Bool(_) => Sort::Bool,
            Value::Int(_) => Sort::Int,
            Value::Str(_) => Sort::Str,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Problems

/// The outcome a benchmark entry is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Solved,
    Unrealizable,
    Unknown,
}

/// The signature of the function to synthesize.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Signature {
    #[serde(default = "Signature::default_name")]
    pub name: String,
    pub start: Nonterminal,
    #[serde(rename = "return")]
    pub ret: Sort,
    #[serde(default)]
    pub inputs: IndexMap<String, Sort>,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

impl Signature {
    fn default_name() -> String {
        "f".to_owned()
    }
}

/// A single input/output example.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Example {
    #[serde(default)]
    pub inputs: IndexMap<String, Value>,
    pub output: Value,
}

/// Synthesis problems.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Problem {
    #[serde(rename = "Synth")]
    pub signature: Signature,
    #[serde(rename = "Nonterminal")]
    pub grammar: Grammar,
    #[serde(rename = "Example", default)]
    pub examples: Vec<Example>,
    /// Per-operator constraint template overrides.
    #[serde(rename = "Semantics", default)]
    pub semantics: IndexMap<String, Vec<String>>,
}

impl Problem {
    pub fn start(&self) -> &Nonterminal {
        &self.signature.start
    }

    pub fn inputs(&self) -> &IndexMap<String, Sort> {
        &self.signature.inputs
    }

    pub fn sort(&self, nt: &Nonterminal) -> Sort {
        self.grammar.sort(nt).unwrap_or_else(|| {
            panic!("undeclared nonterminal '{}' (problem not typechecked)", nt)
        })
    }

    pub fn productions(&self, nt: &Nonterminal) -> &[Production] {
        self.grammar.productions(nt)
    }
}
