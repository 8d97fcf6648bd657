use cdsynth::main_handler;

use ansi_term::Color::*;
use clap::{builder::styling::*, Parser, Subcommand};
use std::path::PathBuf;

mod custom_parse {
    use std::path::PathBuf;

    pub fn at_most_one_path(s: &str) -> Option<PathBuf> {
        if s.is_empty() {
            None
        } else {
            Some(PathBuf::from(s))
        }
    }

    pub fn one_or_more_paths(
        s: &str,
        option: &str,
    ) -> Result<Vec<PathBuf>, String> {
        if s.is_empty() {
            Err(format!("{} must be nonempty", option))
        } else {
            Ok(s.split(",").map(PathBuf::from).collect())
        }
    }
}

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

#[derive(Parser)]
#[command(
    version,
    about = format!("{} of programs from examples",
        Purple.bold().paint("Conflict-driven synthesis"),
    ),
    long_about = None,
    styles = styles(),
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize a program for a problem
    Synth {
        /// The problem file to use (.sy.toml)
        #[arg(short, long, value_name = "FILE")]
        problem: PathBuf,

        /// Search configuration file (.toml, blank for defaults)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        config: String,

        /// The time cutoff to use for synthesis (in seconds)
        #[arg(short, long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Seed for tie-breaking and restarts
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// The oracle backend to use
        #[arg(short, long, value_name = "BACKEND", default_value = "Z3")]
        oracle: cdsynth::menu::Backend,

        /// The tie-break policy to use
        #[arg(long, value_name = "POLICY")]
        tie_break: Option<cdsynth::decide::TieBreak>,

        /// Whether or not to use "quiet" mode
        #[arg(short, long, action)]
        quiet: bool,

        /// Path to output JSON of synthesized program (blank for no output)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        json: String,
    },

    /// Parse and type-check a problem
    Check {
        /// The problem file to use (.sy.toml)
        #[arg(short, long, value_name = "FILE")]
        problem: PathBuf,
    },

    /// Run a benchmark suite
    Benchmark {
        /// The benchmark suite directories to use (comma-separated list)
        #[arg(short, long, value_name = "DIRS")]
        suite: String,

        /// The number of times to run each benchmark entry
        #[arg(short, long, value_name = "N", default_value_t = 1)]
        replicates: usize,

        /// The time cutoff to use for synthesis (in seconds)
        #[arg(short, long, value_name = "SECONDS", default_value_t = 10)]
        timeout: u64,

        /// Filter to benchmark entries that contain this substring
        #[arg(short, long, value_name = "SUBSTRING", default_value = "")]
        filter: String,

        /// Run benchmarks in parallel
        #[arg(short, long, value_name = "BOOL", default_value_t = false)]
        parallel: bool,

        /// The oracle backend to use
        #[arg(short, long, value_name = "BACKEND", default_value = "Z3")]
        oracle: cdsynth::menu::Backend,

        /// Search configuration file (.toml, blank for defaults)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        config: String,
    },
}

impl Command {
    pub fn handle(self) -> Result<i32, String> {
        match self {
            Self::Synth {
                problem,
                config,
                timeout,
                seed,
                oracle,
                tie_break,
                quiet,
                json,
            } => main_handler::synth(main_handler::SynthArgs {
                problem,
                config: custom_parse::at_most_one_path(&config),
                timeout,
                seed,
                backend: oracle,
                tie_break,
                quiet,
                json: custom_parse::at_most_one_path(&json),
            }),
            Self::Check { problem } => {
                main_handler::check(problem).map(|()| 0)
            }
            Self::Benchmark {
                suite,
                replicates,
                timeout,
                filter,
                parallel,
                oracle,
                config,
            } => main_handler::benchmark(
                custom_parse::one_or_more_paths(&suite, "--suite")?,
                replicates,
                timeout,
                filter,
                parallel,
                oracle,
                custom_parse::at_most_one_path(&config),
            )
            .map(|()| 0),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = cli.command.handle();

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1)
        }
    }
}
