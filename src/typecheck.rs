//! # Type checking problems
//!
//! A problem is well-formed if every nonterminal it mentions is declared,
//! every production's label agrees with the sort of its nonterminal and the
//! sorts of its arguments, and every example supplies the declared inputs
//! and an output of the return sort.

use crate::grammar::*;
use crate::problem::*;
use crate::semantics::Semantics;

use indexmap::IndexSet;

pub struct Context<'a>(pub &'a Problem);

#[derive(Debug)]
pub struct Error {
    pub context: Vec<String>,
    pub message: String,
    _private: (),
}

impl Error {
    pub fn with_context(mut self, ctx: String) -> Self {
        self.context.push(ctx);
        self
    }

    pub fn new(message: String) -> Self {
        Self {
            context: vec![],
            message,
            _private: (),
        }
    }

    pub fn nt(nt: &Nonterminal) -> Self {
        Self::new(format!("unknown nonterminal '{}'", nt))
    }

    pub fn sort(what: String, got: Sort, expected: Sort) -> Self {
        Self::new(format!(
            "{} has sort {:?}, expected {:?}",
            what, got, expected
        ))
    }

    pub fn argcount(got: usize, expected: usize) -> Self {
        Self::new(format!("got {} args, expected {}", got, expected))
    }
}

type Check = Result<(), Error>;
type Infer<T> = Result<T, Error>;

pub fn problem(problem: &Problem) -> Check {
    let context = Context(problem);

    context
        .check_signature()
        .map_err(|e| e.with_context("signature".to_owned()))?;

    for (nt, rules) in &problem.grammar.0 {
        context
            .check_rules(rules)
            .map_err(|e| e.with_context(format!("nonterminal '{}'", nt)))?;
    }

    for (i, example) in problem.examples.iter().enumerate() {
        context
            .check_example(example)
            .map_err(|e| e.with_context(format!("example {}", i + 1)))?;
    }

    Semantics::for_problem(problem)
        .map(|_| ())
        .map_err(|e| Error::new(e).with_context("semantics".to_owned()))
}

impl Context<'_> {
    fn infer_nonterminal(&self, nt: &Nonterminal) -> Infer<Sort> {
        self.0.grammar.sort(nt).ok_or_else(|| Error::nt(nt))
    }

    fn check_signature(&self) -> Check {
        let start = self.infer_nonterminal(self.0.start())?;
        if start != self.0.signature.ret {
            return Err(Error::sort(
                format!("start nonterminal '{}'", self.0.start()),
                start,
                self.0.signature.ret,
            ));
        }
        Ok(())
    }

    fn check_rules(&self, rules: &Rules) -> Check {
        let semantics = Semantics::builtin();
        let mut labels = IndexSet::new();
        for p in &rules.productions {
            if !labels.insert(&p.label) {
                return Err(Error::new(format!(
                    "duplicate production label '{}'",
                    p.label
                )));
            }
            self.check_production(&semantics, rules.sort, p)
                .map_err(|e| e.with_context(format!("production '{}'", p)))?;
        }
        Ok(())
    }

    fn check_production(
        &self,
        semantics: &Semantics,
        sort: Sort,
        p: &Production,
    ) -> Check {
        let arg_sorts = p
            .args
            .iter()
            .map(|a| self.infer_nonterminal(a))
            .collect::<Result<Vec<_>, _>>()?;

        let (params, ret) = match p.kind(self.0.inputs()) {
            Label::Str(_) => (vec![], Sort::Str),
            Label::Int(_) => (vec![], Sort::Int),
            Label::Bool(_) => (vec![], Sort::Bool),
            Label::Input(name) => (vec![], self.0.inputs()[name]),
            Label::Operator(op) => match semantics.get(op) {
                Some(o) => (o.params.clone(), o.ret),
                None => {
                    return Err(Error::new(format!(
                        "unknown operator '{}'",
                        op
                    )))
                }
            },
        };

        if arg_sorts.len() != params.len() {
            return Err(Error::argcount(arg_sorts.len(), params.len()));
        }
        for (i, (got, expected)) in arg_sorts.iter().zip(&params).enumerate() {
            if got != expected {
                return Err(Error::sort(
                    format!("argument {} ('{}')", i + 1, p.args[i]),
                    *got,
                    *expected,
                ));
            }
        }
        if ret != sort {
            return Err(Error::sort(format!("label '{}'", p.label), ret, sort));
        }
        Ok(())
    }

    fn check_example(&self, example: &Example) -> Check {
        for (name, sort) in self.0.inputs() {
            let v = example.inputs.get(name).ok_or_else(|| {
                Error::new(format!("missing input '{}'", name))
            })?;
            if v.sort() != *sort {
                return Err(Error::sort(
                    format!("input '{}'", name),
                    v.sort(),
                    *sort,
                ));
            }
        }
        for name in example.inputs.keys() {
            if !self.0.inputs().contains_key(name) {
                return Err(Error::new(format!("unknown input '{}'", name)));
            }
        }
        if example.output.sort() != self.0.signature.ret {
            return Err(Error::sort(
                "output".to_owned(),
                example.output.sort(),
                self.0.signature.ret,
            ));
        }
        Ok(())
    }
}
