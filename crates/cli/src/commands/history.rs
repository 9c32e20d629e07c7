use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use equiv_core::db::HistoryDb;

fn open_history(db_path: &Path) -> Result<HistoryDb> {
    if !db_path.is_file() {
        bail!("History database not found at {}", db_path.display());
    }
    HistoryDb::open(db_path).with_context(|| format!("Failed to open history database at {}", db_path.display()))
}

/// List recorded runs.
pub fn history_command(db_path: &Path, json: bool) -> Result<()> {
    let db = open_history(db_path)?;
    let runs = db.list_runs().context("Failed to list runs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("Runs: (none)");
        return Ok(());
    }

    println!("Runs:");
    for run in runs {
        let r = &run.record;
        let target = r.decompiled_dir.as_deref().unwrap_or("(self-check)");
        println!(
            "- #{} {} seed={} count={} passed {}/{} corpus={} decompiled={} report={}",
            run.id,
            r.started_at,
            r.seed,
            r.count,
            r.passed,
            r.total,
            r.corpus_dir,
            target,
            &r.report_hash[..r.report_hash.len().min(12)]
        );
    }
    Ok(())
}

/// Compare two runs (default: the two most recent). Returns whether no regression was found.
pub fn regressions_command(db_path: &Path, base: Option<i64>, head: Option<i64>, json: bool) -> Result<bool> {
    let db = open_history(db_path)?;
    let latest = db.latest_run_ids(2).context("Failed to read run ids")?;
    let head = match head {
        Some(id) => id,
        None => *latest.first().ok_or_else(|| anyhow!("No runs recorded in {}", db_path.display()))?,
    };
    let base = match base {
        Some(id) => id,
        None => latest
            .iter()
            .copied()
            .find(|id| *id != head)
            .ok_or_else(|| anyhow!("Need at least two runs to compare; pass --base explicitly"))?,
    };

    let regressions = db.regressions(base, head).with_context(|| format!("Failed to compare run {base} with run {head}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&regressions)?);
        return Ok(regressions.is_empty());
    }

    println!("Regressions from run {base} to run {head}:");
    if regressions.is_empty() {
        println!("(none)");
        return Ok(true);
    }
    for r in &regressions {
        println!("- {} #{}: {} -> {}", r.case_name, r.set_index, r.base, r.head);
        if let Some(detail) = &r.detail {
            println!("    {detail}");
        }
    }
    Ok(false)
}
