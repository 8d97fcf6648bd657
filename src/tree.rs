//! # Partial programs
//!
//! A partial program is a derivation tree of the grammar in which some nodes
//! (holes) have a nonterminal but no production yet. Trees have a fixed arity
//! `k` (the maximum production arity of the grammar): every filled node owns
//! exactly `k` child slots, the first `arity(production)` of which are typed
//! and the rest empty.
//!
//! Node ids are positional. The root is [`ROOT`] and child `i` of node `n` is
//! `n * k + i + 1`, so an id denotes the same position in every tree and never
//! changes as the tree is mutated.
//!
//! Nodes live in an arena built on persistent maps, so cloning a [`Program`]
//! (e.g., to snapshot it at a decision level) is O(1) and shares structure
//! with the live tree instead of aliasing it.

use crate::grammar::*;
use crate::logic::Formula;
use crate::util;

use im::{OrdMap, OrdSet};

////////////////////////////////////////////////////////////////////////////////
// Nodes

/// The type of node ids.
pub type NodeId = u64;

/// The id of the root node.
pub const ROOT: NodeId = 0;

/// The id of child `index` of node `id` in a tree of arity `arity`.
pub fn child_id(arity: usize, id: NodeId, index: usize) -> NodeId {
    assert!(index < arity, "child index {} out of bounds", index);
    id.checked_mul(arity as NodeId)
        .and_then(|n| n.checked_add(index as NodeId + 1))
        .unwrap_or_else(|| panic!("node id overflow below node {}", id))
}

/// A slot in the derivation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub nonterminal: Option<Nonterminal>,
    pub production: Option<Production>,
    pub decision_level: usize,
}

impl Node {
    /// Typed, but not derived yet.
    pub fn is_hole(&self) -> bool {
        self.nonterminal.is_some() && self.production.is_none()
    }

    /// An untyped padding slot.
    pub fn is_empty(&self) -> bool {
        self.nonterminal.is_none()
    }

    pub fn is_filled(&self) -> bool {
        self.production.is_some()
    }

    pub fn nonterminal(&self) -> &Nonterminal {
        match &self.nonterminal {
            Some(nt) => nt,
            None => panic!("node {} is empty", self.id),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Programs

/// A partial program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    arity: usize,
    nodes: OrdMap<NodeId, Node>,
    holes: OrdSet<NodeId>,
}

impl Program {
    /// A tree whose only node is a hole of the start nonterminal at level 0.
    pub fn make_root(arity: usize, start: Nonterminal) -> Self {
        assert!(arity > 0, "trees must have positive arity");
        let root = Node {
            id: ROOT,
            depth: 0,
            parent: None,
            nonterminal: Some(start),
            production: None,
            decision_level: 0,
        };
        Self {
            arity,
            nodes: OrdMap::unit(ROOT, root),
            holes: OrdSet::unit(ROOT),
        }
    }

    pub fn new(grammar: &Grammar, start: &Nonterminal) -> Self {
        Self::make_root(grammar.arity(), start.clone())
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(&id) {
            Some(n) => n,
            None => panic!("node {} does not exist", id),
        }
    }

    pub fn root(&self) -> &Node {
        self.node(ROOT)
    }

    pub fn child_id(&self, id: NodeId, index: usize) -> NodeId {
        child_id(self.arity, id, index)
    }

    /// All `k` child slot ids of a node. Empty nodes have no children.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let node = self.node(id);
        assert!(!node.is_empty(), "read children of empty node {}", id);
        (0..self.arity).map(|i| self.child_id(id, i)).collect()
    }

    /// The typed children of a filled node (none for holes).
    pub fn args(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).production {
            Some(p) => (0..p.arity()).map(|i| self.child_id(id, i)).collect(),
            None => vec![],
        }
    }

    /// Derive the hole `id` with `production` at decision level `level`.
    ///
    /// Panics if `id` is not a hole.
    pub fn fill(&mut self, id: NodeId, production: Production, level: usize) {
        let mut node = self.node(id).clone();
        assert!(node.is_hole(), "cannot fill non-hole node {}", id);
        assert!(
            production.arity() <= self.arity,
            "production '{}' exceeds tree arity {}",
            production,
            self.arity
        );

        let depth = node.depth;
        for i in 0..self.arity {
            let cid = self.child_id(id, i);
            let child = Node {
                id: cid,
                depth: depth + 1,
                parent: Some(id),
                nonterminal: production.args.get(i).cloned(),
                production: None,
                decision_level: level,
            };
            if child.is_hole() {
                self.holes.insert(cid);
            }
            self.nodes.insert(cid, child);
        }

        node.production = Some(production);
        node.decision_level = level;
        self.nodes.insert(id, node);
        self.holes.remove(&id);
    }

    /// Discard the subtree below `id` and turn `id` back into a hole.
    pub fn delete(&mut self, id: NodeId) {
        let node = self.node(id).clone();
        assert!(!node.is_empty(), "cannot delete empty node {}", id);

        let mut stack = match node.production {
            Some(_) => self.children(id),
            None => vec![],
        };
        while let Some(cid) = stack.pop() {
            if let Some(child) = self.nodes.remove(&cid) {
                self.holes.remove(&cid);
                if child.is_filled() {
                    stack.extend(self.children_of(&child));
                }
            }
        }

        let level = match node.parent {
            Some(pid) => self.node(pid).decision_level,
            None => 0,
        };
        self.nodes.insert(
            id,
            Node {
                production: None,
                decision_level: level,
                ..node
            },
        );
        self.holes.insert(id);
    }

    fn children_of(&self, node: &Node) -> Vec<NodeId> {
        (0..self.arity).map(|i| self.child_id(node.id, i)).collect()
    }

    /// Delete every derivation made above decision level `level`.
    pub fn retain_levels(&mut self, level: usize) {
        let ids: Vec<NodeId> = self
            .filled()
            .filter(|n| n.decision_level > level)
            .map(|n| n.id)
            .collect();
        for id in ids {
            match self.nodes.get(&id) {
                Some(n) if n.is_filled() && n.decision_level > level => {
                    self.delete(id)
                }
                _ => (),
            }
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.holes.is_empty()
    }

    /// The holes, in breadth-first order.
    pub fn holes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.holes.iter().copied()
    }

    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    /// All non-empty nodes, in breadth-first order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.is_empty())
    }

    /// The derived nodes, in breadth-first order.
    pub fn filled(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_filled())
    }

    pub fn size(&self) -> usize {
        self.filled().count()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes().map(|n| n.depth).max().unwrap_or(0)
    }

    /// The `choice(id, production)` atoms pinning down this derivation.
    pub fn encode(&self) -> Vec<Formula> {
        self.filled()
            .filter_map(|n| {
                n.production
                    .as_ref()
                    .map(|p| Formula::choice(n.id, &p.label))
            })
            .collect()
    }

    /// Check the structural invariants of the tree, panicking on violation.
    pub fn check_invariants(&self) {
        for node in self.nodes.values() {
            assert!(
                node.is_hole() || node.is_empty() || node.is_filled(),
                "node {} is in no state",
                node.id
            );
            assert_eq!(
                node.is_hole(),
                self.holes.contains(&node.id),
                "hole set disagrees on node {}",
                node.id
            );
            if node.is_empty() {
                assert!(node.production.is_none());
            }
            if let Some(p) = &node.production {
                for (i, cid) in self.children_of(node).into_iter().enumerate()
                {
                    let child = self.node(cid);
                    assert_eq!(child.parent, Some(node.id));
                    assert_eq!(child.depth, node.depth + 1);
                    assert_eq!(
                        child.nonterminal.as_ref(),
                        p.args.get(i),
                        "child {} of node {} has the wrong type",
                        cid,
                        node.id
                    );
                }
            }
            if let Some(pid) = node.parent {
                assert!(
                    self.node(pid).is_filled(),
                    "node {} hangs off non-derived parent {}",
                    node.id,
                    pid
                );
            }
        }
        for h in &self.holes {
            assert!(self.nodes.contains_key(h), "dangling hole {}", h);
        }
    }

    /// A pretty tree rendering (for terminal output).
    pub fn pretty(&self) -> termtree::Tree<String> {
        let mut gp = termtree::GlyphPalette::new();
        gp.item_indent = "─";
        gp.skip_indent = " ";

        use ansi_term::Color::*;
        gp.middle_item = Fixed(8).paint(gp.middle_item).to_string().leak();
        gp.last_item = Fixed(8).paint(gp.last_item).to_string().leak();
        gp.item_indent = Fixed(8).paint(gp.item_indent).to_string().leak();
        gp.middle_skip = Fixed(8).paint(gp.middle_skip).to_string().leak();
        gp.last_skip = Fixed(8).paint(gp.last_skip).to_string().leak();
        gp.skip_indent = Fixed(8).paint(gp.skip_indent).to_string().leak();

        self.termtree(gp, ROOT)
    }

    fn termtree(
        &self,
        gp: termtree::GlyphPalette,
        id: NodeId,
    ) -> termtree::Tree<String> {
        use ansi_term::Color::*;

        let node = self.node(id);
        let tag = Fixed(8).paint(util::subscript_numbers(&id.to_string()));
        match &node.production {
            None => termtree::Tree::new(format!(
                "{} {}",
                Yellow.paint(format!("?{}", node.nonterminal())),
                tag
            ))
            .with_glyphs(gp),
            Some(p) => termtree::Tree::new(format!(
                "{} {} {}",
                Cyan.paint(&p.label),
                tag,
                Fixed(8).paint(format!("@{}", node.decision_level)),
            ))
            .with_glyphs(gp)
            .with_leaves(
                self.args(id).into_iter().map(|c| self.termtree(gp, c)),
            ),
        }
    }
}
