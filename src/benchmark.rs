//! # Benchmarking
//!
//! A suite is a directory of problem files (`*.sy.toml`). Every entry is run
//! for a number of replicates with the seed offset by the replicate index,
//! and one CSV record is written per run.

use crate::*;

use indicatif::{ProgressBar, ProgressStyle};
use instant::{Duration, Instant};
use rayon::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Config {
    pub replicates: usize,
    pub timeout: Duration,
    pub entry_filter: String,
    pub parallel: bool,
    pub backend: menu::Backend,
    pub search: search::Config,
}

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub suite: String,
    pub entry: String,
    pub replicate: usize,
    pub backend: menu::Backend,
    pub outcome: String,
    pub expected: String,
    pub as_expected: bool,
    pub duration: u128,
    pub size: usize,
    pub decisions: usize,
    pub conflicts: usize,
    pub lemmas: usize,
    pub restarts: usize,
}

struct Job {
    suite: String,
    entry: String,
    path: PathBuf,
    replicate: usize,
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".sy.toml").to_owned())
        .unwrap_or_default()
}

// Directory format:
// - suite_directory/
//   - some_benchmark_name.sy.toml
//   - another_benchmark.sy.toml
//   - ...
fn jobs(config: &Config, suite_directory: &Path) -> Result<Vec<Job>, String> {
    if !suite_directory.is_dir() {
        return Err(format!(
            "suite '{}' is not a directory",
            suite_directory.display()
        ));
    }

    let suite = name_of(suite_directory);
    let pattern = suite_directory.join("*.sy.toml");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| "suite path is not valid unicode".to_owned())?;

    let mut jobs = vec![];
    for path in glob::glob(pattern)
        .map_err(|e| e.to_string())?
        .filter_map(Result::ok)
    {
        let entry = name_of(&path);
        if !entry.contains(&config.entry_filter) {
            continue;
        }
        for replicate in 0..config.replicates {
            jobs.push(Job {
                suite: suite.clone(),
                entry: entry.clone(),
                path: path.clone(),
                replicate,
            });
        }
    }
    Ok(jobs)
}

fn run_one(config: &Config, job: &Job) -> Result<Record, String> {
    let src = std::fs::read_to_string(&job.path).map_err(|e| e.to_string())?;
    let problem = parse::problem(&src)?;
    typecheck::problem(&problem).map_err(|e| e.message)?;

    let mut search = config.search.clone();
    search.timeout_ms = Some(config.timeout.as_millis() as u64);
    search.seed = search.seed.wrapping_add(job.replicate as u64);

    let mut oracle = config.backend.oracle(&search)?;

    let now = Instant::now();
    let report = search::synthesize(&problem, &search, oracle.as_mut())?;
    let duration = now.elapsed().as_millis();

    let outcome = report.outcome.name();
    let expected = match problem.signature.expect {
        Some(e) => serde_json::to_value(e)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default(),
        None => String::new(),
    };

    Ok(Record {
        suite: job.suite.clone(),
        entry: job.entry.clone(),
        replicate: job.replicate,
        backend: config.backend,
        outcome: outcome.to_owned(),
        as_expected: expected.is_empty() || expected == outcome,
        expected,
        duration,
        size: report.outcome.program().map(|p| p.size()).unwrap_or(0),
        decisions: report.stats.decisions,
        conflicts: report.stats.conflicts,
        lemmas: report.stats.lemmas,
        restarts: report.stats.restarts,
    })
}

/// Run every entry of a suite and collect the records.
pub fn run(
    suite_directory: &Path,
    config: &Config,
) -> Result<Vec<Record>, String> {
    let jobs = jobs(config, suite_directory)?;

    let progress = ProgressBar::new(jobs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{prefix} [{bar:40}] {pos}/{len} {wide_msg}",
        )
        .map_err(|e| e.to_string())?,
    );
    progress.set_prefix(name_of(suite_directory));

    let step = |job: &Job| {
        progress.set_message(job.entry.clone());
        let record = run_one(config, job)
            .map_err(|e| format!("{}: {}", job.entry, e));
        progress.inc(1);
        record
    };

    let records = if config.parallel {
        jobs.par_iter().map(step).collect::<Result<Vec<_>, _>>()
    } else {
        jobs.iter().map(step).collect::<Result<Vec<_>, _>>()
    };

    progress.finish_and_clear();
    records
}

pub struct Runner<W: Write> {
    config: Config,
    writer: csv::Writer<W>,
}

impl<W: Write> Runner<W> {
    pub fn new(config: Config, w: W) -> Self {
        Self {
            config,
            writer: csv::Writer::from_writer(w),
        }
    }

    pub fn suites(&mut self, suite_paths: &[PathBuf]) -> Result<(), String> {
        for path in suite_paths {
            for record in run(path, &self.config)? {
                self.writer.serialize(record).map_err(|e| e.to_string())?;
            }
            self.writer.flush().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
