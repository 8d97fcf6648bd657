//! # Grammars
//!
//! This module defines the context-free grammars that programs are derived
//! from. A grammar maps each nonterminal to its sort and an ordered list of
//! productions; a production is a label (an operator, a literal, or an input
//! variable) together with the nonterminals of its arguments.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Sorts and nonterminals

/// The sorts that values may take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Sort {
    Bool,
    Int,
    Str,
}

/// The type of nonterminal names.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
)]
#[serde(transparent)]
pub struct Nonterminal(pub String);

impl std::fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Productions

/// One grammar rule.
///
/// Productions are written as a label followed by the nonterminals of the
/// arguments, e.g. `str.++ S S`, `"."`, or `name`; see [`crate::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Production {
    pub label: String,
    pub args: Vec<Nonterminal>,
}

impl Production {
    pub fn new(label: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_owned(),
            args: args.iter().map(|a| Nonterminal(a.to_string())).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Whether or not applying this production leaves no new holes behind.
    pub fn is_closing(&self) -> bool {
        self.args.is_empty()
    }

    /// Whether or not two productions give rise to the same child layout.
    pub fn same_shape(&self, other: &Production) -> bool {
        self.args == other.args
    }

    /// Classify the label of this production given the declared inputs.
    pub fn kind<'a, T>(&'a self, inputs: &IndexMap<String, T>) -> Label<'a> {
        let l = self.label.as_str();
        if l.len() >= 2 && l.starts_with('"') && l.ends_with('"') {
            return Label::Str(l[1..l.len() - 1].to_owned());
        }
        if let Ok(n) = l.parse::<i64>() {
            return Label::Int(n);
        }
        match l {
            "true" => Label::Bool(true),
            "false" => Label::Bool(false),
            _ if inputs.contains_key(l) => Label::Input(l),
            _ => Label::Operator(l),
        }
    }
}

impl std::fmt::Display for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)?;
        for a in &self.args {
            write!(f, " {}", a)?;
        }
        Ok(())
    }
}

impl From<Production> for String {
    fn from(p: Production) -> Self {
        p.to_string()
    }
}

/// What a production label denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label<'a> {
    Str(String),
    Int(i64),
    Bool(bool),
    Input(&'a str),
    Operator(&'a str),
}

////////////////////////////////////////////////////////////////////////////////
// Grammars

/// The sort and productions of a single nonterminal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rules {
    pub sort: Sort,
    pub productions: Vec<Production>,
}

/// Production rules for each nonterminal, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Grammar(pub IndexMap<Nonterminal, Rules>);

impl Grammar {
    pub fn rules(&self, nt: &Nonterminal) -> Option<&Rules> {
        self.0.get(nt)
    }

    pub fn productions(&self, nt: &Nonterminal) -> &[Production] {
        match self.0.get(nt) {
            Some(rules) => &rules.productions,
            None => &[],
        }
    }

    pub fn sort(&self, nt: &Nonterminal) -> Option<Sort> {
        self.0.get(nt).map(|r| r.sort)
    }

    /// The fixed arity of derivation trees: the maximum production arity.
    pub fn arity(&self) -> usize {
        self.0
            .values()
            .flat_map(|r| r.productions.iter().map(|p| p.arity()))
            .max()
            .unwrap_or(0)
            .max(1)
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> {
        self.0.keys()
    }
}
