//! # Knowledge base
//!
//! The knowledge base Ω is an append-only set of clauses over
//! `choice(node, production)` atoms. It starts out with the requirement that
//! the root be derived somehow, grows with the structural facts of every
//! derivation the search makes, and accumulates the lemmas learned from
//! conflicts and from rejected candidates. Because node ids are positional,
//! every clause is meaningful in every tree, so Ω survives restarts.

use crate::grammar::*;
use crate::logic::Formula;
use crate::problem::Problem;
use crate::tree::*;

use serde::Serialize;
use std::collections::HashSet;

/// Where a clause of the knowledge base came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LemmaKind {
    Structural,
    Conflict,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    clauses: Vec<Formula>,
    kinds: Vec<LemmaKind>,
    seen: HashSet<Formula>,
    structured: HashSet<(NodeId, String)>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self {
            clauses: vec![],
            kinds: vec![],
            seen: HashSet::new(),
            structured: HashSet::new(),
        }
    }

    /// A knowledge base holding the root-existence clause of a problem.
    pub fn for_problem(problem: &Problem) -> Self {
        let mut kb = Self::new();
        kb.learn(
            Formula::or(
                problem
                    .productions(problem.start())
                    .iter()
                    .map(|p| Formula::choice(ROOT, &p.label)),
            ),
            LemmaKind::Structural,
        );
        kb
    }

    /// Add a clause; returns whether it was new.
    pub fn learn(&mut self, clause: Formula, kind: LemmaKind) -> bool {
        if self.seen.contains(&clause) {
            return false;
        }
        log::debug!("learned {:?} clause: {}", kind, clause);
        self.seen.insert(clause.clone());
        self.clauses.push(clause);
        self.kinds.push(kind);
        true
    }

    /// Add `choice(n, p) ⇒ ∨_q choice(child_i, q)` for every argument of the
    /// production at derived node `id`.
    pub fn learn_structure(
        &mut self,
        problem: &Problem,
        program: &Program,
        id: NodeId,
    ) {
        let production = match &program.node(id).production {
            Some(p) => p.clone(),
            None => return,
        };
        if !self.structured.insert((id, production.label.clone())) {
            return;
        }
        for (i, nt) in production.args.iter().enumerate() {
            let child = program.child_id(id, i);
            self.learn(
                Formula::implies(
                    Formula::choice(id, &production.label),
                    Formula::or(
                        problem
                            .productions(nt)
                            .iter()
                            .map(|q: &Production| Formula::choice(child, &q.label)),
                    ),
                ),
                LemmaKind::Structural,
            );
        }
    }

    pub fn clauses(&self) -> &[Formula] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn count(&self, kind: LemmaKind) -> usize {
        self.kinds.iter().filter(|k| **k == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Formula, LemmaKind)> {
        self.clauses.iter().zip(self.kinds.iter().copied())
    }
}
