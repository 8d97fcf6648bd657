mod common;

use cdsynth::grammar::*;
use cdsynth::logic::Formula;
use cdsynth::tree::*;

fn concat() -> Production {
    Production::new("str.++", &["S", "S"])
}

fn leaf(label: &str) -> Production {
    Production::new(label, &[])
}

fn fresh() -> Program {
    let problem = common::append_dot();
    Program::new(&problem.grammar, problem.start())
}

#[test]
fn root_is_a_hole() {
    let p = fresh();
    assert_eq!(p.arity(), 2);
    assert!(p.root().is_hole());
    assert_eq!(p.holes().collect::<Vec<_>>(), vec![ROOT]);
    assert!(!p.is_concrete());
    assert!(p.encode().is_empty());
    p.check_invariants();
}

#[test]
fn child_ids_are_positional() {
    assert_eq!(child_id(2, 0, 0), 1);
    assert_eq!(child_id(2, 0, 1), 2);
    assert_eq!(child_id(2, 2, 0), 5);
    assert_eq!(child_id(3, 1, 2), 6);
}

#[test]
fn fill_materializes_typed_children() {
    let mut p = fresh();
    p.fill(ROOT, concat(), 1);
    p.check_invariants();

    assert_eq!(p.args(ROOT), vec![1, 2]);
    assert_eq!(p.holes().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(p.node(1).depth, 1);
    assert_eq!(p.node(1).parent, Some(ROOT));
    assert_eq!(p.node(ROOT).decision_level, 1);

    p.fill(1, leaf("x"), 2);
    p.fill(2, leaf("\".\""), 2);
    p.check_invariants();

    assert!(p.is_concrete());
    assert_eq!(p.size(), 3);
    assert_eq!(p.max_depth(), 2);
    assert_eq!(
        p.encode(),
        vec![
            Formula::choice(0, "str.++"),
            Formula::choice(1, "x"),
            Formula::choice(2, "\".\""),
        ]
    );
}

#[test]
fn leaf_children_are_empty() {
    let mut p = fresh();
    p.fill(ROOT, leaf("x"), 1);
    p.check_invariants();

    assert!(p.args(ROOT).is_empty());
    for c in p.children(ROOT) {
        assert!(p.node(c).is_empty());
        assert!(!p.node(c).is_hole());
    }
    assert!(p.is_concrete());
}

#[test]
fn node_states_are_exclusive() {
    let mut p = fresh();
    p.fill(ROOT, concat(), 1);
    p.fill(1, leaf("x"), 1);
    for n in p.nodes() {
        let states = [n.is_hole(), n.is_empty(), n.is_filled()];
        assert_eq!(states.iter().filter(|s| **s).count(), 1);
    }
}

#[test]
#[should_panic]
fn filling_a_filled_node_panics() {
    let mut p = fresh();
    p.fill(ROOT, leaf("x"), 1);
    p.fill(ROOT, leaf("x"), 2);
}

#[test]
#[should_panic]
fn children_of_empty_node_panics() {
    let mut p = fresh();
    p.fill(ROOT, leaf("x"), 1);
    let empty = p.children(ROOT)[0];
    p.children(empty);
}

#[test]
fn delete_resets_subtree() {
    let mut p = fresh();
    p.fill(ROOT, concat(), 1);
    p.fill(1, concat(), 2);
    p.fill(3, leaf("x"), 3);

    p.delete(1);
    p.check_invariants();

    assert!(p.node(1).is_hole());
    assert_eq!(p.node(1).decision_level, 1);
    assert!(p.get(3).is_none());
    assert_eq!(p.holes().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn retain_levels_drops_later_derivations() {
    let mut p = fresh();
    p.fill(ROOT, concat(), 1);
    let after_one = p.clone();
    p.fill(1, leaf("x"), 2);
    p.fill(2, concat(), 3);
    p.fill(5, leaf("\".\""), 3);

    p.retain_levels(1);
    p.check_invariants();

    assert!(p.filled().all(|n| n.decision_level <= 1));
    assert_eq!(p, after_one);
}

#[test]
fn clones_are_independent() {
    let mut p = fresh();
    p.fill(ROOT, concat(), 1);
    let snapshot = p.clone();
    p.fill(1, leaf("x"), 2);

    assert!(snapshot.node(1).is_hole());
    assert!(p.node(1).is_filled());
}
