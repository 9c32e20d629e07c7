pub mod commands;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

/// Every argument set passed.
pub const EXIT_OK: u8 = 0;
/// The run completed and found at least one divergence (or regression).
pub const EXIT_MISMATCH: u8 = 1;
/// The harness itself failed: bad manifest, missing counterpart, no compiler, ...
pub const EXIT_ERROR: u8 = 2;

/// Canonicalize a path if possible, falling back to the given string
/// relative to the current working directory.
pub fn canonicalize_or_current(path: &str) -> Result<PathBuf> {
    let p = Path::new(path);
    if p == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        match p.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(p))
            }
        }
    }
}

/// Resolve a directory argument, failing if it does not exist.
pub fn existing_dir(path: &str, what: &str) -> Result<PathBuf> {
    let resolved = canonicalize_or_current(path)?;
    if !resolved.is_dir() {
        bail!("{what} directory not found: {}", resolved.display());
    }
    Ok(resolved)
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}
