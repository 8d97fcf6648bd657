use crate::*;

use ansi_term::Color::*;
use instant::Duration;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn write_file(path: PathBuf, s: &str) -> Result<(), String> {
    match File::create(path) {
        Ok(mut file) => write!(file, "{}", s).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn load(path: PathBuf) -> Result<problem::Problem, String> {
    let src = std::fs::read_to_string(path).map_err(|e| e.to_string())?;

    let problem = parse::problem(&src)
        .map_err(|e| format!("{}\n{}", Red.bold().paint("parse error:"), e))?;

    typecheck::problem(&problem).map_err(|e| {
        format!(
            "{} {}\n  occurred:{}",
            Red.bold().paint("type error:"),
            ansi_term::Style::new().bold().paint(e.message),
            e.context
                .into_iter()
                .map(|ctx| format!("\n    - in {}", ctx))
                .collect::<Vec<_>>()
                .join("")
        )
    })?;

    Ok(problem)
}

fn load_config(path: Option<PathBuf>) -> Result<search::Config, String> {
    match path {
        Some(path) => {
            let src =
                std::fs::read_to_string(path).map_err(|e| e.to_string())?;
            parse::config(&src).map_err(|e| {
                format!("{}\n{}", Red.bold().paint("parse error (config):"), e)
            })
        }
        None => Ok(search::Config::default()),
    }
}

/// The process exit code of an outcome.
pub fn exit_code(outcome: &search::Outcome) -> i32 {
    match outcome {
        search::Outcome::Solved(_) => 0,
        search::Outcome::Unrealizable => 2,
        search::Outcome::Unknown(_) => 3,
    }
}

pub struct SynthArgs {
    pub problem: PathBuf,
    pub config: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub seed: Option<u64>,
    pub backend: menu::Backend,
    pub tie_break: Option<decide::TieBreak>,
    pub quiet: bool,
    pub json: Option<PathBuf>,
}

pub fn synth(args: SynthArgs) -> Result<i32, String> {
    if let Some(path) = &args.json {
        let ok = match path.parent() {
            Some(parent) => parent.as_os_str().is_empty() || parent.exists(),
            None => false,
        };
        if !ok {
            return Err(format!(
                "{} invalid json path '{}'",
                Red.bold().paint("error:"),
                path.display()
            ));
        }
    }

    let problem = load(args.problem)?;

    let mut config = load_config(args.config)?;
    if let Some(secs) = args.timeout {
        config.timeout_ms = Some(secs * 1000);
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(tie_break) = args.tie_break {
        config.tie_break = tie_break;
    }

    let mut oracle = args.backend.oracle(&config)?;
    let report = search::synthesize(&problem, &config, oracle.as_mut())?;

    match &report.outcome {
        search::Outcome::Solved(program) => {
            if args.quiet {
                println!("{}", unparse::define_fun(&problem, program));
            } else {
                println!(
                    "{}\n\n  {}\n\n{}\n\n{}",
                    Green.bold().paint("Solution:"),
                    unparse::define_fun(&problem, program),
                    Cyan.bold().paint("Derivation tree:"),
                    program.pretty()
                );
            }
            if let Some(json) = args.json {
                let contents = unparse::json(program)?;
                match write_file(json, &contents) {
                    Ok(()) => (),
                    Err(e) => {
                        eprintln!("file write error: {}\njson:\n{}", e, contents)
                    }
                };
            }
        }
        search::Outcome::Unrealizable => {
            println!("{}", Red.bold().paint("Unrealizable"))
        }
        search::Outcome::Unknown(reason) => {
            println!("{} ({:?})", Yellow.bold().paint("Unknown"), reason)
        }
    }

    if !args.quiet {
        let stats = serde_json::to_string_pretty(&report.stats)
            .map_err(|e| e.to_string())?;
        println!(
            "\n{}\n{}\n{}",
            Cyan.bold().paint("Statistics:"),
            stats,
            Fixed(8).paint(format!(
                "{} clauses learned ({} structural, {} conflict, {} blocked)",
                report.knowledge.len(),
                report.knowledge.count(knowledge::LemmaKind::Structural),
                report.knowledge.count(knowledge::LemmaKind::Conflict),
                report.knowledge.count(knowledge::LemmaKind::Blocked),
            ))
        );
    }

    Ok(exit_code(&report.outcome))
}

pub fn check(problem: PathBuf) -> Result<(), String> {
    let problem = load(problem)?;
    println!(
        "{} {} nonterminal(s), {} example(s)",
        Green.bold().paint("ok:"),
        problem.grammar.0.len(),
        problem.examples.len()
    );
    Ok(())
}

pub fn benchmark(
    suite_paths: Vec<PathBuf>,
    replicates: usize,
    timeout_secs: u64,
    entry_filter: String,
    parallel: bool,
    backend: menu::Backend,
    config: Option<PathBuf>,
) -> Result<(), String> {
    let config = benchmark::Config {
        replicates,
        timeout: Duration::from_secs(timeout_secs),
        entry_filter,
        parallel,
        backend,
        search: load_config(config)?,
    };
    let mut runner = benchmark::Runner::new(config, std::io::stdout());
    runner.suites(&suite_paths)
}
