//! # Decisions
//!
//! The decision engine picks the next hole to derive and the production to
//! derive it with. A production is a candidate for a hole if the current
//! derivation, the knowledge base, and the choice itself are jointly
//! satisfiable; the tie-break policy then chooses among the candidates.

use crate::encoder::Context;
use crate::grammar::*;
use crate::knowledge::KnowledgeBase;
use crate::logic::Formula;
use crate::oracle::*;
use crate::search::Config;
use crate::tree::*;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Policies for choosing among consistent candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TieBreak {
    /// Prefer closing productions with probability `closing_bias`.
    ClosingBias,
    Random,
    /// The first candidate in grammar order.
    First,
}

impl TieBreak {
    pub fn all() -> Vec<Self> {
        vec![Self::ClosingBias, Self::Random, Self::First]
    }
}

impl std::str::FromStr for TieBreak {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Choose(NodeId, Production),
    /// The hole has no consistent candidate.
    Stuck(NodeId),
}

/// The productions a hole may take before consulting the oracle.
///
/// Holes at depth `max_depth` or deeper, and holes in index-argument
/// positions of their parent's operator, only take closing productions.
pub fn domain(
    ctx: &Context,
    program: &Program,
    id: NodeId,
    max_depth: usize,
) -> Vec<Production> {
    let node = program.node(id);
    let index_arg = match node.parent {
        Some(pid) => match &program.node(pid).production {
            Some(p) => {
                let position = (0..program.arity())
                    .position(|i| program.child_id(pid, i) == id)
                    .unwrap_or(usize::MAX);
                ctx.semantics.is_index_arg(&p.label, position)
            }
            None => false,
        },
        None => false,
    };
    let closing_only = index_arg || node.depth >= max_depth;
    ctx.problem
        .productions(node.nonterminal())
        .iter()
        .filter(|p| !closing_only || p.is_closing())
        .cloned()
        .collect()
}

/// The disjunction of the choices a hole may take.
pub fn hole_constraint(
    ctx: &Context,
    program: &Program,
    id: NodeId,
    max_depth: usize,
) -> Formula {
    Formula::or(
        domain(ctx, program, id, max_depth)
            .iter()
            .map(|p| Formula::choice(id, &p.label)),
    )
}

/// The productions of `domain` consistent with the derivation and Ω.
///
/// `refuted` lists decisions already known to fail under the current
/// decision prefix. An `unknown` answer keeps the candidate.
pub fn candidates(
    oracle: &mut dyn Oracle,
    ctx: &Context,
    kb: &KnowledgeBase,
    program: &Program,
    id: NodeId,
    max_depth: usize,
    refuted: &[(NodeId, Production)],
) -> Vec<Production> {
    let domain: Vec<Production> = domain(ctx, program, id, max_depth)
        .into_iter()
        .filter(|p| !refuted.iter().any(|(rid, rp)| *rid == id && rp == p))
        .collect();

    oracle.push();
    oracle.assert(kb.clauses());
    oracle.assert(&program.encode());

    let mut consistent = vec![];
    for p in domain {
        oracle.push();
        oracle.assert(&[Formula::choice(id, &p.label)]);
        let result = oracle.check_sat(&[]);
        oracle.pop();
        match result {
            SatResult::Unsat => (),
            SatResult::Sat => consistent.push(p),
            SatResult::Unknown => {
                log::warn!("unknown consistency of {} at node {}", p, id);
                consistent.push(p)
            }
        }
    }

    oracle.pop();
    consistent
}

fn tie_break(
    policy: TieBreak,
    closing_bias: f64,
    mut options: Vec<Production>,
    rng: &mut SmallRng,
) -> Option<Production> {
    match policy {
        TieBreak::First => options.into_iter().next(),
        TieBreak::Random => options.choose(rng).cloned(),
        TieBreak::ClosingBias => {
            let (closing, open): (Vec<_>, Vec<_>) =
                options.drain(..).partition(|p| p.is_closing());
            let group = if closing.is_empty() {
                open
            } else if open.is_empty()
                || rng.gen_bool(closing_bias.clamp(0.0, 1.0))
            {
                closing
            } else {
                open
            };
            group.choose(rng).cloned()
        }
    }
}

/// Decide the first hole (in breadth-first order) of a partial program.
///
/// Panics if the program is concrete.
pub fn decide(
    oracle: &mut dyn Oracle,
    ctx: &Context,
    kb: &KnowledgeBase,
    program: &Program,
    config: &Config,
    refuted: &[(NodeId, Production)],
    rng: &mut SmallRng,
) -> Decision {
    let id = match program.holes().next() {
        Some(id) => id,
        None => panic!("decision requested on a concrete program"),
    };

    let options = candidates(
        oracle,
        ctx,
        kb,
        program,
        id,
        config.max_depth,
        refuted,
    );
    log::trace!("node {} has {} candidates", id, options.len());

    match tie_break(config.tie_break, config.closing_bias, options, rng) {
        Some(p) => Decision::Choose(id, p),
        None => Decision::Stuck(id),
    }
}
