//! Runs a paired corpus end to end: generate inputs, build both variants, execute, compare.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::corpus::{CasePair, CorpusError};
use crate::inputs::{ArgumentSet, InputError, InputGenerator};
use crate::services::differ::{compare, ComparePolicy, Verdict};
use crate::services::executor::{DualExecutor, ExecutorError, Preparation};
use crate::services::report::{summarize, Report, VerdictEntry};
use crate::services::toolchain::{Toolchain, ToolchainError};

/// Compiler diagnostics kept in a compile-failure detail.
const MAX_DIAGNOSTIC_LINES: usize = 12;

/// Failures of the harness itself. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error("input generation for '{case}' failed: {source}")]
    Input { case: String, source: InputError },
    #[error("case '{case}': {source}")]
    Executor { case: String, source: ExecutorError },
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    #[error("failed to create work directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Entries and report of one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// First line of the compiler's version banner.
    pub toolchain_version: String,
    /// Every verdict in (registration, generation) order.
    pub entries: Vec<VerdictEntry>,
    pub report: Report,
}

/// Coordinator that ties a toolchain and configuration to a corpus run.
pub struct HarnessRunner<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub config: &'a HarnessConfig,
}

fn trim_diagnostics(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    if lines.len() <= MAX_DIAGNOSTIC_LINES {
        return stderr.trim().to_string();
    }
    let mut kept = lines[..MAX_DIAGNOSTIC_LINES].join("\n");
    kept.push_str(&format!("\n... ({} more lines)", lines.len() - MAX_DIAGNOSTIC_LINES));
    kept
}

impl<'a> HarnessRunner<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, config: &'a HarnessConfig) -> Self {
        Self { toolchain, config }
    }

    /// Run every pair against `count` argument sets generated from `seed`.
    pub fn run(&self, pairs: &[CasePair], seed: u64, count: usize) -> HarnessResult<RunSummary> {
        let toolchain_version = self.toolchain.probe()?;
        info!(toolchain = self.toolchain.name(), version = %toolchain_version, cases = pairs.len(), seed, count, "starting run");

        // All inputs up front so generation errors abort before anything executes.
        let generator = InputGenerator::new(self.config.generator.clone());
        let mut inputs = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let sets = generator
                .generate_for_case(&pair.case, seed, count)
                .map_err(|source| HarnessError::Input { case: pair.case.name().to_string(), source })?;
            inputs.push(sets);
        }

        let per_case = self.run_pool(pairs, &inputs)?;
        let entries: Vec<VerdictEntry> = per_case.into_iter().flatten().collect();
        let report = summarize(&entries);
        info!(total = report.total, passed = report.passed, failed = report.failed, "run finished");
        Ok(RunSummary { toolchain_version, entries, report })
    }

    fn run_pool(&self, pairs: &[CasePair], inputs: &[Vec<ArgumentSet>]) -> HarnessResult<Vec<Vec<VerdictEntry>>> {
        let workers = self.config.workers.max(1).min(pairs.len().max(1));
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let mut slots: Vec<Option<Vec<VerdictEntry>>> = vec![None; pairs.len()];
        let mut first_error: Option<HarnessError> = None;

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, HarnessResult<Vec<VerdictEntry>>)>();
            for worker in 0..workers {
                let tx = tx.clone();
                let (next, abort) = (&next, &abort);
                scope.spawn(move || loop {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(pair) = pairs.get(index) else {
                        break;
                    };
                    debug!(worker, case = pair.case.name(), "picked case");
                    let result = self.run_case(pair, &inputs[index]);
                    if result.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (index, result) in rx {
                match result {
                    Ok(entries) => slots[index] = Some(entries),
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        });

        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
    }

    /// Build and run one case in a private work directory.
    fn run_case(&self, pair: &CasePair, sets: &[ArgumentSet]) -> HarnessResult<Vec<VerdictEntry>> {
        let case = &pair.case;
        let workdir = tempfile::Builder::new().prefix("decomp-equiv-").tempdir()?;
        let executor = DualExecutor::new(self.toolchain, self.config);
        let wrap = |source| HarnessError::Executor { case: case.name().to_string(), source };

        let entry = |set: &ArgumentSet, verdict: Verdict, detail: Option<String>| VerdictEntry {
            case: case.name().to_string(),
            category: case.category,
            set_index: set.index,
            provenance: set.provenance,
            verdict,
            detail,
            arguments: set.to_string(),
        };

        let prepared = match executor.prepare(pair, workdir.path()).map_err(wrap)? {
            Preparation::Ready(prepared) => prepared,
            Preparation::CompileFailure { variant, stderr } => {
                let detail = format!("{} variant: {}", variant.as_str(), trim_diagnostics(&stderr));
                return Ok(sets.iter().map(|set| entry(set, Verdict::CompileFailure, Some(detail.clone()))).collect());
            }
        };

        let policy = ComparePolicy::for_case(case, self.config);
        let mut entries = Vec::with_capacity(sets.len());
        for set in sets {
            let (original, decompiled) = executor.run(&prepared, set).map_err(wrap)?;
            let comparison = compare(&original, &decompiled, &policy);
            if !comparison.verdict.is_pass() {
                warn!(case = case.name(), set = set.index, verdict = %comparison.verdict, "divergence");
            }
            entries.push(entry(set, comparison.verdict, comparison.detail));
        }
        debug!(case = case.name(), workdir = %workdir.path().display(), sets = entries.len(), "case finished");
        Ok(entries)
    }
}

