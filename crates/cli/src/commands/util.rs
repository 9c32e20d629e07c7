use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use equiv_core::config::HarnessConfig;
use equiv_core::corpus::{load_corpus, CorpusRegistry};
use equiv_core::services::report::{render_text, Report};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workers: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub compiler: Option<String>,
}

/// Load the harness config (defaults when no file is given) and apply CLI overrides.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<HarnessConfig> {
    let mut config = match path {
        Some(p) => HarnessConfig::load(p).with_context(|| format!("Failed to load config {}", p.display()))?,
        None => HarnessConfig::default(),
    };
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(compiler) = &overrides.compiler {
        config.compiler = compiler.clone();
    }
    config.validate().context("Invalid harness configuration")?;
    Ok(config)
}

/// Load and validate the corpus manifest in `corpus_dir`.
pub fn load_registry(corpus_dir: &Path) -> Result<CorpusRegistry> {
    load_corpus(corpus_dir).with_context(|| format!("Failed to load corpus at {}", corpus_dir.display()))
}

/// Write the report to `path`: JSON for a `.json` extension, text otherwise.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    let is_json = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false);
    let contents = if is_json {
        let mut json = serde_json::to_string_pretty(report)?;
        json.push('\n');
        json
    } else {
        render_text(report)
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
