//! # Interpretation
//!
//! Concrete evaluation of fully derived programs. The search only reasons
//! about abstract features, so every accepted candidate is re-checked here
//! against the literal examples.

use crate::grammar::*;
use crate::problem::*;
use crate::tree::*;

use indexmap::IndexMap;

pub trait Interpreter {
    fn evaluate(
        &self,
        program: &Program,
        inputs: &IndexMap<String, Value>,
    ) -> Result<Value, String>;
}

/// The SMT-LIB semantics of the string and integer operators.
pub struct Smtlib;

impl Interpreter for Smtlib {
    fn evaluate(
        &self,
        program: &Program,
        inputs: &IndexMap<String, Value>,
    ) -> Result<Value, String> {
        eval(program, ROOT, inputs)
    }
}

/// Whether `program` maps the inputs of every example to its output.
pub fn satisfies(
    interpreter: &dyn Interpreter,
    program: &Program,
    examples: &[Example],
) -> bool {
    examples.iter().enumerate().all(|(i, ex)| {
        match interpreter.evaluate(program, &ex.inputs) {
            Ok(v) if v == ex.output => true,
            Ok(v) => {
                log::debug!(
                    "example {}: got {}, expected {}",
                    i,
                    v,
                    ex.output
                );
                false
            }
            Err(e) => {
                log::debug!("example {}: {}", i, e);
                false
            }
        }
    })
}

fn eval(
    program: &Program,
    id: NodeId,
    inputs: &IndexMap<String, Value>,
) -> Result<Value, String> {
    let node = program.node(id);
    let production = node
        .production
        .as_ref()
        .ok_or_else(|| format!("cannot evaluate hole at node {}", id))?;

    match production.kind(inputs) {
        Label::Str(s) => Ok(Value::Str(s)),
        Label::Int(n) => Ok(Value::Int(n)),
        Label::Bool(b) => Ok(Value::Bool(b)),
        Label::Input(name) => inputs
            .get(name)
            .cloned()
            .ok_or_else(|| format!("missing input '{}'", name)),
        Label::Operator(op) => {
            let args = program
                .args(id)
                .into_iter()
                .map(|c| eval(program, c, inputs))
                .collect::<Result<Vec<_>, _>>()?;
            apply(op, &args)
        }
    }
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn substring(cs: &[char], start: i64, len: i64) -> String {
    let n = cs.len() as i64;
    if start < 0 || start >= n || len <= 0 {
        return String::new();
    }
    let end = (start + len).min(n);
    cs[start as usize..end as usize].iter().collect()
}

fn index_of(s: &str, t: &str, from: i64) -> i64 {
    let (cs, ts) = (chars(s), chars(t));
    let n = cs.len() as i64;
    if from < 0 || from > n {
        return -1;
    }
    (from as usize..=cs.len())
        .find(|i| cs[*i..].starts_with(&ts))
        .map(|i| i as i64)
        .unwrap_or(-1)
}

fn apply(op: &str, args: &[Value]) -> Result<Value, String> {
    use Value::*;

    let overflow = || format!("integer overflow in '{}'", op);

    Ok(match (op, args) {
        ("str.++", [Str(a), Str(b)]) => Str(format!("{}{}", a, b)),
        ("str.at", [Str(s), Int(i)]) => Str(substring(&chars(s), *i, 1)),
        ("str.substr", [Str(s), Int(i), Int(n)]) => {
            Str(substring(&chars(s), *i, *n))
        }
        ("str.len", [Str(s)]) => Int(s.chars().count() as i64),
        ("str.indexof", [Str(s), Str(t), Int(i)]) => Int(index_of(s, t, *i)),
        ("str.replace", [Str(s), Str(t), Str(u)]) => {
            if t.is_empty() {
                Str(format!("{}{}", u, s))
            } else {
                Str(s.replacen(t.as_str(), u, 1))
            }
        }
        ("int.to.str", [Int(n)]) => {
            Str(if *n < 0 { String::new() } else { n.to_string() })
        }
        ("str.to.int", [Str(s)]) => Int(
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                s.parse::<i64>().map_err(|_| overflow())?
            } else {
                -1
            },
        ),
        ("+", [Int(a), Int(b)]) => Int(a.checked_add(*b).ok_or_else(overflow)?),
        ("-", [Int(a), Int(b)]) => Int(a.checked_sub(*b).ok_or_else(overflow)?),
        ("str.prefixof", [Str(a), Str(b)]) => Bool(b.starts_with(a.as_str())),
        ("str.suffixof", [Str(a), Str(b)]) => Bool(b.ends_with(a.as_str())),
        ("str.contains", [Str(a), Str(b)]) => Bool(a.contains(b.as_str())),
        ("ite", [Bool(c), x, y]) => {
            if *c {
                x.clone()
            } else {
                y.clone()
            }
        }
        _ => {
            return Err(format!(
                "cannot apply '{}' to ({})",
                op,
                args.iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        }
    })
}
