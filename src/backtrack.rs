//! # Backtracking
//!
//! The decision trail records one entry per explicit decision together with
//! a snapshot of the program right after the decision was applied. Since
//! programs are persistent, snapshots share structure with the live tree and
//! cost O(1) to take; reverting to level `L` restores snapshot `L`, and level
//! 0 is the fresh tree.
//!
//! The trail also remembers, for each decision prefix, the decisions that
//! were unwound because Ω admitted no completion of them.

use crate::grammar::Production;
use crate::tree::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub level: usize,
    pub node: NodeId,
    pub production: Production,
}

#[derive(Debug, Clone)]
pub struct Trail {
    entries: Vec<Entry>,
    snapshots: Vec<Program>,
    refuted: Vec<Vec<(NodeId, Production)>>,
}

impl Trail {
    pub fn new(fresh: &Program) -> Self {
        Self {
            entries: vec![],
            snapshots: vec![fresh.clone()],
            refuted: vec![vec![]],
        }
    }

    /// The current decision level (the number of decisions on the trail).
    pub fn level(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Record a decision that was just applied to `program`; returns its
    /// level.
    pub fn record(&mut self, program: &Program, node: NodeId) -> usize {
        let production = match &program.node(node).production {
            Some(p) => p.clone(),
            None => panic!("recorded decision on hole {}", node),
        };
        let level = self.level() + 1;
        self.entries.push(Entry {
            level,
            node,
            production,
        });
        self.snapshots.push(program.clone());
        self.refuted.push(vec![]);
        level
    }

    /// The program as it was right after decision `level`.
    pub fn snapshot(&self, level: usize) -> &Program {
        &self.snapshots[level]
    }

    /// Drop every decision above `level` and return the matching snapshot.
    pub fn revert(&mut self, level: usize) -> Program {
        let level = level.min(self.level());
        self.entries.truncate(level);
        self.snapshots.truncate(level + 1);
        self.refuted.truncate(level + 1);
        self.snapshots[level].clone()
    }

    /// Undo the most recent decision in place, marking it refuted for the
    /// remaining prefix. Returns the new level, or `None` if the trail is
    /// empty.
    pub fn pop_in_place(&mut self, program: &mut Program) -> Option<usize> {
        let entry = self.entries.pop()?;
        program.delete(entry.node);
        program.retain_levels(entry.level - 1);
        self.snapshots.truncate(entry.level);
        self.refuted.truncate(entry.level);
        if let Some(r) = self.refuted.last_mut() {
            r.push((entry.node, entry.production));
        }
        Some(entry.level - 1)
    }

    /// Decisions known to fail under the current prefix.
    pub fn refuted(&self) -> &[(NodeId, Production)] {
        match self.refuted.last() {
            Some(r) => r,
            None => &[],
        }
    }
}

/// The level to revert to after a conflict implicating `levels`.
///
/// One implicated level `L` reverts to `L - 1`; several revert to the
/// second-highest of them.
pub fn target_level(levels: &[usize]) -> usize {
    let mut distinct = levels.to_vec();
    distinct.sort();
    distinct.dedup();
    match distinct.as_slice() {
        [] => 0,
        [l] => l.saturating_sub(1),
        [.., second, _] => *second,
    }
}
