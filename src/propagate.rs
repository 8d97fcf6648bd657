//! # Propagation
//!
//! Propagation derives the holes whose production is forced: a production
//! `p` is forced at hole `h` if Ω, the current derivation and "`h` takes some
//! production of its domain" together entail `choice(h, p)`. Forced holes are
//! filled at the current decision level, and filling one may force others, so
//! propagation runs to a fixpoint. It never decides a hole that still has a
//! genuine choice.

use crate::decide;
use crate::encoder::Context;
use crate::knowledge::KnowledgeBase;
use crate::logic::Formula;
use crate::oracle::*;
use crate::tree::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    Fixpoint { forced: usize },
    /// Ω admits no completion of the current derivation.
    Inconsistent,
}

fn domains(ctx: &Context, program: &Program, max_depth: usize) -> Vec<Formula> {
    program
        .holes()
        .map(|h| decide::hole_constraint(ctx, program, h, max_depth))
        .collect()
}

/// Check Ω, the derivation, and the domain of every hole together.
pub fn consistent(
    oracle: &mut dyn Oracle,
    ctx: &Context,
    kb: &KnowledgeBase,
    program: &Program,
    max_depth: usize,
) -> SatResult {
    oracle.push();
    oracle.assert(kb.clauses());
    oracle.assert(&program.encode());
    oracle.assert(&domains(ctx, program, max_depth));
    let result = oracle.check_sat(&[]);
    oracle.pop();
    result
}

/// Fill forced holes at decision level `level` until none are left.
pub fn propagate(
    oracle: &mut dyn Oracle,
    ctx: &Context,
    kb: &mut KnowledgeBase,
    program: &mut Program,
    level: usize,
    max_depth: usize,
) -> Propagation {
    let mut forced = 0;
    loop {
        if consistent(oracle, ctx, kb, program, max_depth) == SatResult::Unsat {
            return Propagation::Inconsistent;
        }

        let mut progress = false;
        let mut stack: Vec<NodeId> = program.holes().collect();
        stack.reverse();

        while let Some(h) = stack.pop() {
            if !program.node(h).is_hole() {
                continue;
            }

            let domain = decide::domain(ctx, program, h, max_depth);
            let found = if domain.len() == 1 {
                Some(domain[0].clone())
            } else {
                oracle.push();
                oracle.assert(kb.clauses());
                oracle.assert(&program.encode());
                oracle.assert(&[Formula::or(
                    domain.iter().map(|p| Formula::choice(h, &p.label)),
                )]);
                if oracle.check_sat(&[]) == SatResult::Unsat {
                    oracle.pop();
                    return Propagation::Inconsistent;
                }
                let found = domain
                    .iter()
                    .find(|p| {
                        oracle.valid(&[], &Formula::choice(h, &p.label))
                            == Validity::Valid
                    })
                    .cloned();
                oracle.pop();
                found
            };

            if let Some(p) = found {
                log::debug!("propagated {} at node {} (level {})", p, h, level);
                program.fill(h, p, level);
                kb.learn_structure(ctx.problem, program, h);
                forced += 1;
                progress = true;
                stack.extend(
                    program
                        .args(h)
                        .into_iter()
                        .rev()
                        .filter(|c| program.node(*c).is_hole()),
                );
            }
        }

        if !progress {
            return Propagation::Fixpoint { forced };
        }
    }
}
