//! # Conflicts
//!
//! Conflict detection checks the program specification of a partial program
//! against each example in turn. On the first unsatisfiable example, the
//! unsat core of the check is traced back to the derived nodes whose
//! constraints take part in it.
//!
//! Conflict analysis turns those nodes into a lemma. At each implicated node,
//! every production of the same shape whose own constraints entail the
//! node's part of the core would fail in the same way, so the lemma rules
//! them out together; the per-node clauses are joined by a disjunction so
//! that fixing any single node satisfies the lemma.

use crate::encoder::Context;
use crate::grammar::*;
use crate::logic::Formula;
use crate::oracle::*;
use crate::tree::*;

use std::collections::BTreeMap;

/// A program-specification clause of an unsat core, traced back to its
/// origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implicated {
    pub generic: Formula,
    pub node: NodeId,
    pub production: Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    NoExamples,
    NoConflict,
    Conflict {
        example: usize,
        core: Vec<Implicated>,
    },
    /// No example conflicts, but the oracle could not decide at least one.
    Unknown,
}

pub fn detect(
    oracle: &mut dyn Oracle,
    ctx: &Context,
    program: &Program,
) -> Detection {
    if ctx.problem.examples.is_empty() {
        return Detection::NoExamples;
    }

    let spec = ctx.program_spec(program);
    let mut unknown = false;

    for (i, example) in ctx.problem.examples.iter().enumerate() {
        let mut assumptions = spec.clauses.clone();
        assumptions.extend(ctx.example_constraint(example));

        match oracle.check_sat(&assumptions) {
            SatResult::Sat => (),
            SatResult::Unknown => {
                log::warn!("unknown conflict status for example {}", i);
                unknown = true;
            }
            SatResult::Unsat => {
                let core = oracle
                    .unsat_core()
                    .iter()
                    .flat_map(|clause| spec.trace(clause))
                    .map(|prov| Implicated {
                        generic: prov.generic.clone(),
                        node: prov.node,
                        production: prov.production.clone(),
                    })
                    .collect();
                return Detection::Conflict { example: i, core };
            }
        }
    }

    if unknown {
        Detection::Unknown
    } else {
        Detection::NoConflict
    }
}

/// A learned clause and the decision levels of the nodes it mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lemma {
    pub formula: Formula,
    /// Distinct, ascending.
    pub levels: Vec<usize>,
}

pub fn analyze(
    oracle: &mut dyn Oracle,
    ctx: &Context,
    program: &Program,
    core: &[Implicated],
) -> Lemma {
    let mut by_node: BTreeMap<NodeId, (&Production, Vec<Formula>)> =
        BTreeMap::new();
    for imp in core {
        by_node
            .entry(imp.node)
            .or_insert((&imp.production, vec![]))
            .1
            .push(imp.generic.clone());
    }

    let mut clauses = vec![];
    let mut levels = vec![];

    for (id, (current, generics)) in by_node {
        let node = program.node(id);
        let nt = node.nonterminal();
        let conclusion = Formula::and(generics);

        let mut blocked = vec![];
        for q in ctx.problem.productions(nt) {
            if !q.same_shape(current) {
                continue;
            }
            if q == current
                || oracle.valid(&ctx.schema(nt, q), &conclusion)
                    == Validity::Valid
            {
                blocked.push(Formula::not(Formula::choice(id, &q.label)));
            }
        }

        log::debug!(
            "node {} blames {} production(s) for {}",
            id,
            blocked.len(),
            conclusion
        );

        clauses.push(Formula::and(blocked));
        levels.push(node.decision_level);
    }

    levels.sort();
    levels.dedup();

    Lemma {
        formula: Formula::or(clauses),
        levels,
    }
}
