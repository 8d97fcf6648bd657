//! # Operator semantics
//!
//! The semantics table maps every operator label to its signature and to a
//! list of constraint templates relating the abstract features of its result
//! (`o.F`) to those of its arguments (`x1.F`, `x2.F`, ...) and of the program
//! inputs (`in.NAME.F`). Templates are over-approximations of the concrete
//! behavior: they must hold whenever the operator is applied in a useful way,
//! so a conflict among them is a genuine reason to reject a derivation.

use crate::grammar::Sort;
use crate::logic::Formula;
use crate::parse;
use crate::problem::Problem;

use indexmap::IndexMap;

/// The semantics of a single operator.
#[derive(Debug, Clone)]
pub struct Operator {
    pub params: Vec<Sort>,
    pub ret: Sort,
    pub templates: Vec<Formula>,
    /// Argument positions (0-based) that are indices into another argument.
    pub index_args: Vec<usize>,
}

/// The semantics table.
#[derive(Debug, Clone)]
pub struct Semantics {
    operators: IndexMap<String, Operator>,
}

const BUILTIN: &[(&str, &[Sort], Sort, &[&str], &[usize])] = {
    use Sort::*;
    &[
        (
            "str.++",
            &[Str, Str],
            Str,
            &[
                "o.len = x1.len + x2.len",
                "0 < x1.len",
                "0 < x2.len",
                "o.first = x1.first",
                "o.last = x2.last",
            ],
            &[],
        ),
        (
            "str.at",
            &[Str, Int],
            Str,
            &["o.len = 1", "0 <= x2.val", "x2.val < x1.len"],
            &[1],
        ),
        (
            "str.substr",
            &[Str, Int, Int],
            Str,
            &[
                "o.len = x3.val",
                "0 <= x2.val",
                "x2.val < x1.len",
                "0 < x3.val",
                "x3.val <= x1.len - x2.val",
            ],
            &[1, 2],
        ),
        ("str.len", &[Str], Int, &["o.val = x1.len"], &[]),
        (
            "str.indexof",
            &[Str, Str, Int],
            Int,
            &["-1 <= o.val", "o.val <= x1.len", "0 <= x3.val"],
            &[2],
        ),
        ("str.replace", &[Str, Str, Str], Str, &[], &[]),
        ("int.to.str", &[Int], Str, &[], &[]),
        ("str.to.int", &[Str], Int, &["-1 <= o.val"], &[]),
        ("+", &[Int, Int], Int, &["o.val = x1.val + x2.val"], &[]),
        ("-", &[Int, Int], Int, &["o.val = x1.val - x2.val"], &[]),
        ("str.prefixof", &[Str, Str], Bool, &[], &[]),
        ("str.suffixof", &[Str, Str], Bool, &[], &[]),
        ("str.contains", &[Str, Str], Bool, &[], &[]),
        ("ite", &[Bool, Str, Str], Str, &[], &[]),
    ]
};

/// Features carried by values of each sort.
pub fn features(sort: Sort) -> &'static [&'static str] {
    match sort {
        Sort::Str => &["len", "first", "last"],
        Sort::Int | Sort::Bool => &["val"],
    }
}

/// Constraints every node of a sort satisfies.
pub fn sort_axioms(sort: Sort) -> Vec<Formula> {
    let src: &[&str] = match sort {
        Sort::Str => &["0 <= o.len"],
        Sort::Bool => &["0 <= o.val", "o.val <= 1"],
        Sort::Int => &[],
    };
    src.iter().filter_map(|s| parse::template(s).ok()).collect()
}

impl Semantics {
    /// The built-in semantics of the SMT-LIB string and integer operators.
    pub fn builtin() -> Self {
        let mut operators = IndexMap::new();
        for (label, params, ret, templates, index_args) in BUILTIN {
            let templates = templates
                .iter()
                .map(|t| {
                    parse::template(t).unwrap_or_else(|e| {
                        panic!("built-in template for '{}': {}", label, e)
                    })
                })
                .collect();
            operators.insert(
                label.to_string(),
                Operator {
                    params: params.to_vec(),
                    ret: *ret,
                    templates,
                    index_args: index_args.to_vec(),
                },
            );
        }
        Self { operators }
    }

    /// The built-in semantics with the problem's template overrides applied.
    pub fn for_problem(problem: &Problem) -> Result<Self, String> {
        let mut semantics = Self::builtin();
        for (label, srcs) in &problem.semantics {
            let op = semantics.operators.get_mut(label).ok_or_else(|| {
                format!("cannot override semantics of unknown operator '{}'", label)
            })?;
            let mut templates = vec![];
            for src in srcs {
                let phi = parse::template(src)?;
                check_template(problem, label, op, &phi)?;
                templates.push(phi);
            }
            op.templates = templates;
        }
        Ok(semantics)
    }

    pub fn get(&self, label: &str) -> Option<&Operator> {
        self.operators.get(label)
    }

    pub fn is_index_arg(&self, label: &str, index: usize) -> bool {
        self.get(label)
            .map(|op| op.index_args.contains(&index))
            .unwrap_or(false)
    }

    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.operators.keys()
    }
}

fn check_template(
    problem: &Problem,
    label: &str,
    op: &Operator,
    phi: &Formula,
) -> Result<(), String> {
    for s in phi.symbols() {
        let owner = s.owner().unwrap_or("");
        let sort = if owner == "o" {
            Some(op.ret)
        } else if let Some(name) = owner.strip_prefix("in.") {
            problem.inputs().get(name).copied()
        } else if let Some(i) = owner.strip_prefix('x') {
            i.parse::<usize>()
                .ok()
                .filter(|i| *i >= 1)
                .and_then(|i| op.params.get(i - 1).copied())
        } else {
            None
        };
        match sort {
            Some(sort) if features(sort).contains(&s.feature()) => (),
            _ => {
                return Err(format!(
                    "template symbol '{}' is meaningless for operator '{}'",
                    s, label
                ))
            }
        }
    }
    Ok(())
}
