mod common;

use cdsynth::backtrack::{self, Trail};
use cdsynth::conflict::{self, Detection};
use cdsynth::decide::TieBreak;
use cdsynth::encoder::Context;
use cdsynth::grammar::*;
use cdsynth::interpret::{self, Interpreter, Smtlib};
use cdsynth::knowledge::{KnowledgeBase, LemmaKind};
use cdsynth::logic::Formula;
use cdsynth::oracle::{Oracle, SatResult};
use cdsynth::problem::*;
use cdsynth::search::*;
use cdsynth::semantics::Semantics;
use cdsynth::tree::*;
use cdsynth::unparse;
use cdsynth::util::{EarlyCutoff, Timer};

use indexmap::IndexMap;
use std::time::Duration;

fn config() -> Config {
    Config {
        timeout_ms: Some(60_000),
        ..Config::default()
    }
}

#[test]
fn append_dot_is_solved() {
    let problem = common::append_dot();
    let mut oracle = common::oracle();
    let report = synthesize(&problem, &config(), &mut oracle).unwrap();

    let program = match &report.outcome {
        Outcome::Solved(p) => p,
        other => panic!("expected a solution, got {:?}", other),
    };
    assert!(program.is_concrete());
    assert!(interpret::satisfies(&Smtlib, program, &problem.examples));
    assert_eq!(unparse::sexp(program), "(str.++ x \".\")");
}

#[test]
fn empty_to_x_is_unrealizable() {
    let problem = common::empty_to_x();
    let mut oracle = common::oracle();
    let report = synthesize(&problem, &config(), &mut oracle).unwrap();

    assert_eq!(report.outcome, Outcome::Unrealizable);
    assert!(report.knowledge.count(LemmaKind::Conflict) > 0);
}

#[test]
fn pad_two_conflict_blocks_both_literals() {
    let problem = common::pad_two();
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();

    let mut program = Program::new(&problem.grammar, problem.start());
    program.fill(ROOT, Production::new("\"aa\"", &[]), 1);

    let core = match conflict::detect(&mut oracle, &ctx, &program) {
        Detection::Conflict { example, core } => {
            assert_eq!(example, 0);
            core
        }
        other => panic!("expected a conflict, got {:?}", other),
    };
    assert!(!core.is_empty());
    assert!(core.iter().all(|imp| imp.node == ROOT));

    let lemma = conflict::analyze(&mut oracle, &ctx, &program, &core);
    assert_eq!(
        lemma.formula,
        Formula::and([
            Formula::not(Formula::choice(ROOT, "\"aa\"")),
            Formula::not(Formula::choice(ROOT, "\"bb\"")),
        ])
    );
    assert_eq!(lemma.levels, vec![1]);
    assert_eq!(backtrack::target_level(&lemma.levels), 0);
}

#[test]
fn pad_two_lemma_is_learned_during_search() {
    let problem = common::pad_two();
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();
    let mut kb = KnowledgeBase::for_problem(&problem);
    let config = Config {
        tie_break: TieBreak::First,
        ..config()
    };
    let (mut synth, mut attempt) = stepper(ctx, &mut oracle, &Smtlib, config);
    let timer = Timer::infinite();

    // First tries x, then "aa"; both conflict with the first example.
    let mut state = State::Propagate;
    for _ in 0..200 {
        if kb.count(LemmaKind::Conflict) == 2 {
            break;
        }
        match synth.step(&mut kb, &mut attempt, state, &timer).unwrap() {
            Step::Continue(next) => state = next,
            Step::Done(outcome) => panic!("finished early with {:?}", outcome),
        }
    }

    let lemmas: Vec<&Formula> = kb
        .iter()
        .filter(|(_, kind)| *kind == LemmaKind::Conflict)
        .map(|(f, _)| f)
        .collect();
    assert_eq!(
        lemmas,
        vec![
            &Formula::not(Formula::choice(ROOT, "x")),
            &Formula::and([
                Formula::not(Formula::choice(ROOT, "\"aa\"")),
                Formula::not(Formula::choice(ROOT, "\"bb\"")),
            ]),
        ]
    );
    assert_eq!(attempt.trail.level(), 0);

    // Only str.++ is left for the root, so propagation takes it.
    assert_eq!(state, State::Propagate);
    synth.step(&mut kb, &mut attempt, state, &timer).unwrap();
    let root = attempt.program.root();
    assert_eq!(root.production.as_ref().unwrap().label, "str.++");
    assert_eq!(root.decision_level, 0);
}

#[test]
fn shared_clause_conflicts_blame_every_node() {
    let problem = common::load(
        r#"
[Synth]
start = "S"
return = "Str"
inputs = { x = "Str" }

[Nonterminal.S]
sort = "Str"
productions = ["str.++ S S", "x", "\".\""]

[Semantics]
"str.++" = ["o.len = x1.len + x2.len", "in.x.len = 3"]

[[Example]]
inputs = { x = "ab" }
output = "abab"
"#,
    );
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();

    let concat = Production::new("str.++", &["S", "S"]);
    let mut program = Program::new(&problem.grammar, problem.start());
    program.fill(ROOT, concat.clone(), 1);
    program.fill(1, concat, 2);

    let core = match conflict::detect(&mut oracle, &ctx, &program) {
        Detection::Conflict { core, .. } => core,
        other => panic!("expected a conflict, got {:?}", other),
    };
    let mut nodes: Vec<NodeId> = core.iter().map(|imp| imp.node).collect();
    nodes.sort();
    assert_eq!(nodes, vec![ROOT, 1]);

    let lemma = conflict::analyze(&mut oracle, &ctx, &program, &core);
    assert_eq!(
        lemma.formula,
        Formula::or([
            Formula::not(Formula::choice(ROOT, "str.++")),
            Formula::not(Formula::choice(1, "str.++")),
        ])
    );
    assert_eq!(lemma.levels, vec![1, 2]);
    assert_eq!(backtrack::target_level(&lemma.levels), 1);
}

#[test]
fn wide_characters_are_solved() {
    let problem = common::load(
        r#"
[Synth]
start = "S"
return = "Str"
inputs = { x = "Str" }

[Nonterminal.S]
sort = "Str"
productions = ["x", "\".\""]

[[Example]]
inputs = { x = "中" }
output = "中"
"#,
    );
    for mut oracle in common::oracles() {
        let report = synthesize(&problem, &config(), oracle.as_mut()).unwrap();
        let program = match &report.outcome {
            Outcome::Solved(p) => p,
            other => panic!("{}: expected a solution, got {:?}", oracle.name(), other),
        };
        assert_eq!(unparse::sexp(program), "x");
    }
}

#[test]
fn large_integers_are_solved() {
    let problem = common::load(
        r#"
[Synth]
start = "I"
return = "Int"
inputs = { x = "Int" }

[Nonterminal.I]
sort = "Int"
productions = ["x", "1", "+ I I"]

[[Example]]
inputs = { x = 5000 }
output = 5001
"#,
    );
    for mut oracle in common::oracles() {
        let report = synthesize(&problem, &config(), oracle.as_mut()).unwrap();
        let program = match &report.outcome {
            Outcome::Solved(p) => p,
            other => panic!("{}: expected a solution, got {:?}", oracle.name(), other),
        };
        assert!(interpret::satisfies(&Smtlib, program, &problem.examples));
    }
}

#[test]
fn extreme_integers_do_not_overflow() {
    let problem = common::load(
        r#"
[Synth]
start = "I"
return = "Int"
inputs = { x = "Int" }

[Nonterminal.I]
sort = "Int"
productions = ["1", "+ I I", "x"]

[[Example]]
inputs = { x = -9223372036854775808 }
output = -9223372036854775808
"#,
    );
    for mut oracle in common::oracles() {
        let report = synthesize(&problem, &config(), oracle.as_mut()).unwrap();
        let program = match &report.outcome {
            Outcome::Solved(p) => p,
            other => panic!("{}: expected a solution, got {:?}", oracle.name(), other),
        };
        assert!(interpret::satisfies(&Smtlib, program, &problem.examples));
    }
}

#[test]
fn pad_two_is_solved() {
    let problem = common::pad_two();
    let mut oracle = common::oracle();
    let report = synthesize(&problem, &config(), &mut oracle).unwrap();

    let program = report.outcome.program().expect("solution");
    assert!(interpret::satisfies(&Smtlib, program, &problem.examples));
}

#[test]
fn no_examples_accepts_any_derivation() {
    let problem = common::load(
        r#"
[Synth]
start = "S"
return = "Str"

[Nonterminal.S]
sort = "Str"
productions = ["\".\"", "str.++ S S"]
"#,
    );
    let mut oracle = common::oracle();
    let report = synthesize(&problem, &config(), &mut oracle).unwrap();
    let program = report.outcome.program().expect("solution");
    assert!(program.is_concrete());
    assert_eq!(report.stats.conflicts, 0);
}

#[test]
fn backjump_targets() {
    assert_eq!(backtrack::target_level(&[3]), 2);
    assert_eq!(backtrack::target_level(&[1, 4, 2]), 2);
    assert_eq!(backtrack::target_level(&[0]), 0);
    assert_eq!(backtrack::target_level(&[2, 2]), 1);
    assert_eq!(backtrack::target_level(&[]), 0);
}

#[test]
fn revert_restores_snapshots() {
    let problem = common::append_dot();
    let mut program = Program::new(&problem.grammar, problem.start());
    let mut trail = Trail::new(&program);

    let concat = Production::new("str.++", &["S", "S"]);
    program.fill(ROOT, concat.clone(), 1);
    assert_eq!(trail.record(&program, ROOT), 1);
    let left = program.child_id(ROOT, 0);
    let right = program.child_id(ROOT, 1);
    program.fill(left, concat, 2);
    assert_eq!(trail.record(&program, left), 2);
    program.fill(right, Production::new("x", &[]), 3);
    assert_eq!(trail.record(&program, right), 3);

    let snapshot = trail.snapshot(1).clone();
    let reverted = trail.revert(1);

    assert_eq!(trail.level(), 1);
    assert!(reverted.filled().all(|n| n.decision_level <= 1));
    assert_eq!(
        reverted.holes().collect::<Vec<_>>(),
        snapshot.holes().collect::<Vec<_>>()
    );
    assert_eq!(reverted.holes().collect::<Vec<_>>(), vec![left, right]);
    reverted.check_invariants();
}

#[test]
fn pop_in_place_marks_refuted() {
    let problem = common::append_dot();
    let mut program = Program::new(&problem.grammar, problem.start());
    let mut trail = Trail::new(&program);

    let x = Production::new("x", &[]);
    program.fill(ROOT, x.clone(), 1);
    trail.record(&program, ROOT);

    assert_eq!(trail.pop_in_place(&mut program), Some(0));
    assert!(program.root().is_hole());
    assert_eq!(trail.refuted(), &[(ROOT, x)]);
    assert_eq!(trail.pop_in_place(&mut program), None);
}

fn stepper<'a>(
    ctx: Context<'a>,
    oracle: &'a mut dyn cdsynth::oracle::Oracle,
    interpreter: &'a dyn Interpreter,
    config: Config,
) -> (Synthesizer<'a>, Attempt) {
    let attempt = Attempt::new(&ctx);
    (Synthesizer::new(ctx, oracle, interpreter, config), attempt)
}

#[test]
fn knowledge_only_grows() {
    let problem = common::pad_two();
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();
    let mut kb = KnowledgeBase::for_problem(&problem);
    let (mut synth, mut attempt) =
        stepper(ctx, &mut oracle, &Smtlib, config());

    let timer = Timer::infinite();
    let mut state = State::Propagate;
    for _ in 0..2000 {
        let before = kb.clauses().to_vec();
        let step = synth.step(&mut kb, &mut attempt, state, &timer).unwrap();
        assert!(kb.len() >= before.len());
        assert_eq!(&kb.clauses()[..before.len()], before.as_slice());
        match step {
            Step::Continue(next) => state = next,
            Step::Done(outcome) => {
                assert!(outcome.program().is_some());
                return;
            }
        }
    }
    panic!("no verdict within 2000 steps");
}

#[test]
fn replay_with_fixed_tie_break_is_deterministic() {
    let problem = common::pad_two();
    let config = Config {
        tie_break: TieBreak::First,
        ..config()
    };

    let mut oracle = common::oracle();
    let first = synthesize(&problem, &config, &mut oracle).unwrap();

    let semantics = Semantics::for_problem(&problem).unwrap();
    let mut outcomes = vec![];
    for _ in 0..2 {
        let ctx = Context::new(&problem, &semantics);
        let mut oracle = common::oracle();
        let mut kb = first.knowledge.clone();
        let mut synth =
            Synthesizer::new(ctx, &mut oracle, &Smtlib, config.clone());
        outcomes.push(synth.run(&mut kb));
    }
    assert_eq!(outcomes[0], outcomes[1]);
    assert!(outcomes[0].program().is_some());
}

struct Rejecting;

impl Interpreter for Rejecting {
    fn evaluate(
        &self,
        _program: &Program,
        _inputs: &IndexMap<String, Value>,
    ) -> Result<Value, String> {
        Err("rejected".to_owned())
    }
}

#[test]
fn rejected_candidates_are_blocked() {
    let problem = common::load(
        r#"
[Synth]
start = "S"
return = "Str"

[Nonterminal.S]
sort = "Str"
productions = ["\".\""]

[[Example]]
output = "."
"#,
    );
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();
    let mut kb = KnowledgeBase::for_problem(&problem);
    let (mut synth, mut attempt) =
        stepper(ctx, &mut oracle, &Rejecting, config());
    let timer = Timer::infinite();

    let mut state = State::Propagate;
    while state != State::Accept {
        match synth.step(&mut kb, &mut attempt, state, &timer).unwrap() {
            Step::Continue(next) => state = next,
            Step::Done(outcome) => panic!("finished early with {:?}", outcome),
        }
    }
    assert!(attempt.program.is_concrete());

    let step = synth.step(&mut kb, &mut attempt, state, &timer).unwrap();
    assert_eq!(step, Step::Continue(State::Restart));
    assert_eq!(kb.count(LemmaKind::Blocked), 1);
    assert_eq!(synth.stats().blocked, 1);

    // The only derivation is now blocked.
    let step = synth
        .step(&mut kb, &mut attempt, State::Restart, &timer)
        .unwrap();
    assert_eq!(step, Step::Done(Outcome::Unrealizable));
}

#[test]
fn inconsistent_decisions_are_unwound() {
    let problem = common::append_dot();
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();
    let mut kb = KnowledgeBase::for_problem(&problem);
    let (mut synth, mut attempt) =
        stepper(ctx, &mut oracle, &Smtlib, config());
    let timer = Timer::infinite();

    let concat = Production::new("str.++", &["S", "S"]);
    attempt.program.fill(ROOT, concat.clone(), 1);
    attempt.trail.record(&attempt.program, ROOT);
    kb.learn(
        Formula::not(Formula::choice(ROOT, "str.++")),
        LemmaKind::Conflict,
    );

    let step = synth
        .step(&mut kb, &mut attempt, State::Propagate, &timer)
        .unwrap();
    assert_eq!(step, Step::Continue(State::Propagate));
    assert_eq!(attempt.trail.level(), 0);
    assert!(attempt.program.root().is_hole());
    assert_eq!(attempt.trail.refuted(), &[(ROOT, concat)]);
    assert_eq!(synth.stats().backtracks, 1);
}

#[test]
fn inconsistency_without_decisions_restarts() {
    let problem = common::append_dot();
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();
    let mut kb = KnowledgeBase::for_problem(&problem);
    let config = Config {
        max_depth: 0,
        ..config()
    };
    let (mut synth, mut attempt) = stepper(ctx, &mut oracle, &Smtlib, config);
    let timer = Timer::infinite();

    // Ω still allows str.++, but not at the depth limit.
    for l in ["x", "\".\""] {
        kb.learn(Formula::not(Formula::choice(ROOT, l)), LemmaKind::Conflict);
    }
    let step = synth
        .step(&mut kb, &mut attempt, State::Propagate, &timer)
        .unwrap();
    assert_eq!(step, Step::Continue(State::Restart));
}

/// Answers `unknown` to every check.
struct Undecided;

impl Oracle for Undecided {
    fn name(&self) -> &'static str {
        "undecided"
    }

    fn assert(&mut self, _formulas: &[Formula]) {}

    fn push(&mut self) {}

    fn pop(&mut self) {}

    fn check_sat(&mut self, _assumptions: &[Formula]) -> SatResult {
        SatResult::Unknown
    }

    fn unsat_core(&self) -> Vec<Formula> {
        vec![]
    }
}

#[test]
fn repeated_unknowns_give_up() {
    let problem = common::append_dot();
    let config = Config {
        unknown_threshold: 2,
        ..config()
    };
    let report = synthesize(&problem, &config, &mut Undecided).unwrap();

    assert_eq!(report.outcome, Outcome::Unknown(Reason::Oracle));
    assert_eq!(report.stats.unknowns, 3);
    assert_eq!(report.stats.restarts, 2);
}

#[test]
fn stale_restarts_exhaust_the_search() {
    let problem = common::append_dot();
    let config = Config {
        unknown_threshold: 100,
        max_stale_restarts: 2,
        ..config()
    };
    let report = synthesize(&problem, &config, &mut Undecided).unwrap();

    assert_eq!(report.outcome, Outcome::Unknown(Reason::Exhausted));
    assert_eq!(report.stats.restarts, 3);
    assert_eq!(report.knowledge.len(), 1);
}

#[test]
fn expired_timer_stops_the_search() {
    let problem = common::append_dot();
    let semantics = Semantics::for_problem(&problem).unwrap();
    let ctx = Context::new(&problem, &semantics);
    let mut oracle = common::oracle();
    let mut kb = KnowledgeBase::for_problem(&problem);
    let (mut synth, mut attempt) =
        stepper(ctx, &mut oracle, &Smtlib, config());

    let timer = Timer::finite(Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(2));
    assert_eq!(
        synth.step(&mut kb, &mut attempt, State::Propagate, &timer),
        Err(EarlyCutoff::TimerExpired)
    );
    assert_eq!(synth.stats().iterations, 0);

    let report = synthesize(
        &problem,
        &Config {
            timeout_ms: Some(0),
            ..Config::default()
        },
        &mut common::oracle(),
    );
    // A zero budget may still finish before the first tick.
    match report.unwrap().outcome {
        Outcome::Unknown(Reason::Timeout) | Outcome::Solved(_) => (),
        other => panic!("unexpected outcome {:?}", other),
    }
}
