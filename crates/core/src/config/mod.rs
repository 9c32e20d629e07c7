//! Harness configuration.
//!
//! Every field has a default, so an empty YAML/JSON document (or no file at all) is valid.
//! Frontends layer their own overrides on top after loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that selects the C compiler ahead of `CC`.
pub const COMPILER_ENV: &str = "DECOMP_EQUIV_CC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Input generation knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Element count used for "mid-sized" buffers and strings in boundary rows.
    pub mid_len: u64,
    /// Upper bound for randomly chosen dimension parameters without a declared range.
    pub max_dimension: u64,
    /// Upper bound for random string lengths.
    pub max_string_len: usize,
    /// Hard cap on elements per buffer; a length expression exceeding it is an error.
    pub max_buffer_elems: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { mid_len: 8, max_dimension: 8, max_string_len: 16, max_buffer_elems: 4096 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub compiler: String,
    pub cflags: Vec<String>,
    pub link_flags: Vec<String>,
    pub timeout_ms: u64,
    pub memory_limit_mb: u64,
    pub workers: usize,
    /// Relative tolerance for float returns; 0 means bit-exact.
    pub float_tolerance: f64,
    /// Relative tolerance applied to cases tagged `float_sensitive`.
    pub float_sensitive_tolerance: f64,
    /// Redzone bytes appended after every harness-allocated buffer.
    pub guard_bytes: usize,
    pub generator: GeneratorConfig,
}

fn default_compiler() -> String {
    std::env::var(COMPILER_ENV)
        .or_else(|_| std::env::var("CC"))
        .ok()
        .filter(|cc| !cc.trim().is_empty())
        .unwrap_or_else(|| "cc".to_string())
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            cflags: vec!["-std=gnu11".to_string(), "-O0".to_string()],
            link_flags: vec!["-lm".to_string()],
            timeout_ms: 2000,
            memory_limit_mb: 256,
            workers: default_workers(),
            float_tolerance: 0.0,
            float_sensitive_tolerance: 1e-6,
            guard_bytes: 16,
            generator: GeneratorConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from YAML or JSON (chosen by extension), filling unspecified fields with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let is_json = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false);
        let parsed: Result<Self, String> = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        let config = parsed.map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.trim().is_empty() {
            return Err(ConfigError::Invalid("compiler must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if !(self.float_tolerance >= 0.0 && self.float_sensitive_tolerance >= 0.0) {
            return Err(ConfigError::Invalid("float tolerances must be non-negative".into()));
        }
        if self.generator.max_buffer_elems == 0 {
            return Err(ConfigError::Invalid("generator.max_buffer_elems must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    pub fn memory_limit_bytes(&self) -> Option<u64> {
        (self.memory_limit_mb > 0).then(|| self.memory_limit_mb.saturating_mul(1024 * 1024))
    }
}
