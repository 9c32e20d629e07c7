use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use equiv_core::corpus::{pair_cases, self_check_pairs};
use equiv_core::db::{HistoryDb, RunRecord};
use equiv_core::services::harness::{HarnessRunner, RunSummary};
use equiv_core::services::report::render_text;
use equiv_core::services::toolchain::CcToolchain;
use tracing::info;

use crate::commands::util::{load_config, load_registry, write_report, ConfigOverrides};

/// Inputs of `run` and `self-check`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub corpus: PathBuf,
    /// `None` runs every case against itself.
    pub decompiled: Option<PathBuf>,
    pub seed: u64,
    pub count: usize,
    pub config: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub report: Option<PathBuf>,
    pub history_db: Option<PathBuf>,
}

/// Run the harness. Returns whether every argument set passed.
pub fn run_command(options: &RunOptions) -> Result<bool> {
    let config = load_config(options.config.as_deref(), &options.overrides)?;
    let registry = load_registry(&options.corpus)?;
    let pairs = match &options.decompiled {
        Some(dir) => pair_cases(&registry, &options.corpus, dir).context("Failed to pair corpus with decompiled output")?,
        None => self_check_pairs(&registry, &options.corpus),
    };
    info!(cases = pairs.len(), self_check = options.decompiled.is_none(), "paired corpus");

    let toolchain = CcToolchain::from_config(&config);
    let runner = HarnessRunner::new(&toolchain, &config);
    let started_at = Utc::now().to_rfc3339();
    let summary = runner.run(&pairs, options.seed, options.count).context("Harness run failed")?;
    let finished_at = Utc::now().to_rfc3339();

    print!("{}", render_text(&summary.report));

    if let Some(path) = &options.report {
        write_report(path, &summary.report)?;
        println!("\nReport written to {}", path.display());
    }

    if let Some(db_path) = &options.history_db {
        let id = record_history(db_path, options, &summary, started_at, finished_at)?;
        println!("Recorded run {id} in {}", db_path.display());
    }

    Ok(summary.report.all_passed())
}

fn record_history(
    db_path: &std::path::Path,
    options: &RunOptions,
    summary: &RunSummary,
    started_at: String,
    finished_at: String,
) -> Result<i64> {
    let db = HistoryDb::open(db_path)
        .with_context(|| format!("Failed to open history database at {}", db_path.display()))?;
    let record = RunRecord {
        started_at,
        finished_at,
        seed: options.seed,
        count: options.count,
        corpus_dir: options.corpus.display().to_string(),
        decompiled_dir: options.decompiled.as_ref().map(|d| d.display().to_string()),
        toolchain: Some(summary.toolchain_version.clone()),
        report_hash: summary.report.digest(),
        total: summary.report.total,
        passed: summary.report.passed,
    };
    db.record_run(&record, &summary.entries).context("Failed to record run history")
}
