//! # Search
//!
//! The search driver is a state machine over one attempt (a partial program
//! and its decision trail) and the knowledge base Ω:
//!
//! - `Propagate` fills forced holes. If Ω admits no completion, the latest
//!   decisions are unwound in place until it does (or the attempt restarts).
//! - `CheckConflict` tests the program specification against the examples.
//!   A conflict is analyzed into a lemma, which is learned before jumping
//!   back to the level the lemma points at. Without a conflict, concrete
//!   programs move on to `Accept` and partial ones to `Decide`.
//! - `Decide` derives one more hole, or restarts if the hole has no
//!   consistent candidate.
//! - `Accept` runs the interpreter on the examples; a mismatch blocks the
//!   candidate in Ω and restarts.
//! - `Restart` starts a fresh attempt that keeps Ω.
//!
//! Whenever Ω grows it is checked on its own; if it is unsatisfiable, no
//! program of the grammar satisfies the examples.

use crate::backtrack::{self, Trail};
use crate::bundled;
use crate::conflict::{self, Detection};
use crate::decide::{self, Decision, TieBreak};
use crate::encoder::Context;
use crate::interpret::{self, Interpreter};
use crate::knowledge::{KnowledgeBase, LemmaKind};
use crate::logic::Formula;
use crate::oracle::*;
use crate::problem::Problem;
use crate::propagate::{self, Propagation};
use crate::semantics::Semantics;
use crate::tree::*;
use crate::util::{EarlyCutoff, Timer};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Configuration

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub timeout_ms: Option<u64>,
    pub tie_break: TieBreak,
    pub closing_bias: f64,
    pub max_depth: usize,
    pub restart_after: usize,
    pub restart_probability: f64,
    pub restart_growth: f64,
    pub unknown_threshold: usize,
    pub max_stale_restarts: usize,
    pub seed: u64,
    pub bound: i64,
    pub node_budget: usize,
}

impl Default for Config {
    fn default() -> Self {
        let oracle = bundled::Config::default();
        Self {
            timeout_ms: None,
            tie_break: TieBreak::ClosingBias,
            closing_bias: 0.6,
            max_depth: 6,
            restart_after: 30,
            restart_probability: 0.1,
            restart_growth: 1.5,
            unknown_threshold: 16,
            max_stale_restarts: 64,
            seed: 0,
            bound: oracle.bound,
            node_budget: oracle.node_budget,
        }
    }
}

impl Config {
    pub fn bundled(&self) -> bundled::Config {
        bundled::Config {
            bound: self.bound,
            node_budget: self.node_budget,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Outcomes

/// Why a search gave up without a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reason {
    Timeout,
    /// Too many oracle `unknown` answers.
    Oracle,
    /// Restarts stopped teaching Ω anything.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Solved(Program),
    Unrealizable,
    Unknown(Reason),
}

impl Outcome {
    pub fn program(&self) -> Option<&Program> {
        match self {
            Outcome::Solved(p) => Some(p),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Solved(_) => "solved",
            Outcome::Unrealizable => "unrealizable",
            Outcome::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub iterations: usize,
    pub decisions: usize,
    pub propagated: usize,
    pub conflicts: usize,
    pub lemmas: usize,
    pub restarts: usize,
    pub backtracks: usize,
    pub blocked: usize,
    pub unknowns: usize,
}

////////////////////////////////////////////////////////////////////////////////
// State machine

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Propagate,
    CheckConflict,
    Decide,
    Accept,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue(State),
    Done(Outcome),
}

/// The state owned by one attempt; a restart replaces it wholesale.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub program: Program,
    pub trail: Trail,
}

impl Attempt {
    pub fn new(ctx: &Context) -> Self {
        let program = Program::new(&ctx.problem.grammar, ctx.problem.start());
        let trail = Trail::new(&program);
        Self { program, trail }
    }
}

pub struct Synthesizer<'a> {
    ctx: Context<'a>,
    oracle: &'a mut dyn Oracle,
    interpreter: &'a dyn Interpreter,
    config: Config,
    rng: SmallRng,
    stats: Stats,
    checked: usize,
    restart_threshold: f64,
    conflicts_since_restart: usize,
    unknowns: usize,
    stale_restarts: usize,
    kb_at_restart: usize,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        ctx: Context<'a>,
        oracle: &'a mut dyn Oracle,
        interpreter: &'a dyn Interpreter,
        config: Config,
    ) -> Self {
        Self {
            ctx,
            oracle,
            interpreter,
            rng: SmallRng::seed_from_u64(config.seed),
            restart_threshold: config.restart_after as f64,
            config,
            stats: Stats::default(),
            checked: 0,
            conflicts_since_restart: 0,
            unknowns: 0,
            stale_restarts: 0,
            kb_at_restart: 0,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Search until a verdict, the timeout, or giving up.
    pub fn run(&mut self, kb: &mut KnowledgeBase) -> Outcome {
        let timer = Timer::from_millis(self.config.timeout_ms);
        let mut attempt = Attempt::new(&self.ctx);
        let mut state = State::Propagate;
        self.kb_at_restart = kb.len();

        loop {
            match self.step(kb, &mut attempt, state, &timer) {
                Ok(Step::Continue(next)) => state = next,
                Ok(Step::Done(outcome)) => {
                    log::info!(
                        "{} after {} iterations ({} clauses in Ω)",
                        outcome.name(),
                        self.stats.iterations,
                        kb.len()
                    );
                    return outcome;
                }
                Err(EarlyCutoff::TimerExpired) => {
                    log::info!(
                        "timed out after {} iterations",
                        self.stats.iterations
                    );
                    return Outcome::Unknown(Reason::Timeout);
                }
            }
        }
    }

    /// Run one transition of the state machine.
    pub fn step(
        &mut self,
        kb: &mut KnowledgeBase,
        attempt: &mut Attempt,
        state: State,
        timer: &Timer,
    ) -> Result<Step, EarlyCutoff> {
        timer.tick()?;
        self.stats.iterations += 1;

        if kb.len() != self.checked {
            self.checked = kb.len();
            if self.oracle.satisfiable(kb.clauses()) == SatResult::Unsat {
                return Ok(Step::Done(Outcome::Unrealizable));
            }
        }

        log::debug!("{:?} at level {}", state, attempt.trail.level());

        Ok(match state {
            State::Propagate => self.propagate(kb, attempt),
            State::CheckConflict => self.check_conflict(kb, attempt),
            State::Decide => self.decide(kb, attempt),
            State::Accept => self.accept(kb, attempt),
            State::Restart => self.restart(kb, attempt),
        })
    }

    fn propagate(
        &mut self,
        kb: &mut KnowledgeBase,
        attempt: &mut Attempt,
    ) -> Step {
        let level = attempt.trail.level();
        let result = propagate::propagate(
            &mut *self.oracle,
            &self.ctx,
            kb,
            &mut attempt.program,
            level,
            self.config.max_depth,
        );

        match result {
            Propagation::Fixpoint { forced } => {
                self.stats.propagated += forced;
                Step::Continue(State::CheckConflict)
            }
            Propagation::Inconsistent => {
                log::debug!("Ω admits no completion at level {}", level);
                while let Some(l) =
                    attempt.trail.pop_in_place(&mut attempt.program)
                {
                    self.stats.backtracks += 1;
                    let status = propagate::consistent(
                        &mut *self.oracle,
                        &self.ctx,
                        kb,
                        &attempt.program,
                        self.config.max_depth,
                    );
                    if status != SatResult::Unsat {
                        log::debug!("unwound to level {}", l);
                        return Step::Continue(State::Propagate);
                    }
                }
                Step::Continue(State::Restart)
            }
        }
    }

    fn check_conflict(
        &mut self,
        kb: &mut KnowledgeBase,
        attempt: &mut Attempt,
    ) -> Step {
        let detection =
            conflict::detect(&mut *self.oracle, &self.ctx, &attempt.program);

        match detection {
            Detection::NoExamples | Detection::NoConflict => {
                if attempt.program.is_concrete() {
                    Step::Continue(State::Accept)
                } else {
                    Step::Continue(State::Decide)
                }
            }
            Detection::Unknown if attempt.program.is_concrete() => {
                self.stats.unknowns += 1;
                Step::Continue(State::Accept)
            }
            Detection::Unknown => self.unknown(attempt),
            Detection::Conflict { example, core } => {
                self.stats.conflicts += 1;
                self.conflicts_since_restart += 1;

                if core.is_empty() {
                    log::warn!(
                        "example {} conflicts without blaming a node",
                        example
                    );
                    return Step::Continue(State::Restart);
                }

                let lemma = conflict::analyze(
                    &mut *self.oracle,
                    &self.ctx,
                    &attempt.program,
                    &core,
                );
                log::debug!(
                    "example {} conflict, lemma {} (levels {:?})",
                    example,
                    lemma.formula,
                    lemma.levels
                );

                if !kb.learn(lemma.formula, LemmaKind::Conflict) {
                    log::warn!("conflict relearned an existing lemma");
                    return Step::Continue(State::Restart);
                }
                self.stats.lemmas += 1;

                let target = backtrack::target_level(&lemma.levels);
                attempt.program = attempt.trail.revert(target);
                self.stats.backtracks += 1;

                if self.should_restart() {
                    Step::Continue(State::Restart)
                } else {
                    Step::Continue(State::Propagate)
                }
            }
        }
    }

    fn unknown(&mut self, attempt: &mut Attempt) -> Step {
        self.stats.unknowns += 1;
        self.unknowns += 1;
        if self.unknowns > self.config.unknown_threshold {
            return Step::Done(Outcome::Unknown(Reason::Oracle));
        }

        let level = attempt.trail.level();
        if level == 0 {
            return Step::Continue(State::Restart);
        }
        attempt.program = attempt.trail.revert(level - 1);
        self.stats.backtracks += 1;
        Step::Continue(State::Propagate)
    }

    fn decide(&mut self, kb: &mut KnowledgeBase, attempt: &mut Attempt) -> Step {
        let decision = decide::decide(
            &mut *self.oracle,
            &self.ctx,
            kb,
            &attempt.program,
            &self.config,
            attempt.trail.refuted(),
            &mut self.rng,
        );

        match decision {
            Decision::Choose(id, production) => {
                let level = attempt.trail.level() + 1;
                log::debug!(
                    "decided {} at node {} (level {})",
                    production,
                    id,
                    level
                );
                attempt.program.fill(id, production, level);
                kb.learn_structure(self.ctx.problem, &attempt.program, id);
                attempt.trail.record(&attempt.program, id);
                self.stats.decisions += 1;
                Step::Continue(State::Propagate)
            }
            Decision::Stuck(id) => {
                log::debug!("node {} has no candidates", id);
                Step::Continue(State::Restart)
            }
        }
    }

    fn accept(&mut self, kb: &mut KnowledgeBase, attempt: &mut Attempt) -> Step {
        if interpret::satisfies(
            self.interpreter,
            &attempt.program,
            &self.ctx.problem.examples,
        ) {
            return Step::Done(Outcome::Solved(attempt.program.clone()));
        }

        log::debug!("interpreter rejected candidate");
        kb.learn(
            Formula::not(Formula::and(attempt.program.encode())),
            LemmaKind::Blocked,
        );
        self.stats.blocked += 1;
        Step::Continue(State::Restart)
    }

    fn restart(&mut self, kb: &mut KnowledgeBase, attempt: &mut Attempt) -> Step {
        self.stats.restarts += 1;
        self.conflicts_since_restart = 0;

        if kb.len() == self.kb_at_restart {
            self.stale_restarts += 1;
            if self.stale_restarts > self.config.max_stale_restarts {
                return Step::Done(Outcome::Unknown(Reason::Exhausted));
            }
        } else {
            self.stale_restarts = 0;
        }
        self.kb_at_restart = kb.len();

        log::info!(
            "restart {} ({} clauses in Ω)",
            self.stats.restarts,
            kb.len()
        );
        *attempt = Attempt::new(&self.ctx);
        Step::Continue(State::Propagate)
    }

    fn should_restart(&mut self) -> bool {
        if (self.conflicts_since_restart as f64) < self.restart_threshold {
            return false;
        }
        let p = self.config.restart_probability.clamp(0.0, 1.0);
        if !self.rng.gen_bool(p) {
            return false;
        }
        self.restart_threshold *= self.config.restart_growth.max(1.0);
        true
    }
}

////////////////////////////////////////////////////////////////////////////////
// Top-level

/// The result of a complete synthesis run.
#[derive(Debug, Clone)]
pub struct Report {
    pub outcome: Outcome,
    pub stats: Stats,
    pub knowledge: KnowledgeBase,
}

/// Synthesize a program for a (type-checked) problem.
pub fn synthesize(
    problem: &Problem,
    config: &Config,
    oracle: &mut dyn Oracle,
) -> Result<Report, String> {
    let semantics = Semantics::for_problem(problem)?;
    let ctx = Context::new(problem, &semantics);
    let interpreter = interpret::Smtlib;
    let mut knowledge = KnowledgeBase::for_problem(problem);

    let mut synthesizer =
        Synthesizer::new(ctx, oracle, &interpreter, config.clone());
    let outcome = synthesizer.run(&mut knowledge);

    Ok(Report {
        outcome,
        stats: synthesizer.stats().clone(),
        knowledge,
    })
}
