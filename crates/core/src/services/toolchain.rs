//! C toolchain seam: compiling and linking variants and drivers.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::config::HarnessConfig;

/// Macro that renames a `main` defined by a variant so it links next to the harness driver.
const MAIN_RENAME: &str = "-Dmain=decomp_equiv_variant_main";

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to spawn compiler '{compiler}': {source}")]
    Spawn { compiler: String, source: std::io::Error },
    #[error("{stage} of {} failed ({status})", .input.display())]
    Failed { stage: &'static str, input: PathBuf, status: String, stderr: String },
    #[error("compiler probe failed: {0}")]
    Probe(String),
}

impl ToolchainError {
    /// Compiler diagnostics, if the compiler ran at all.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ToolchainError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Per-unit compile options on top of the toolchain's base flags.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Header force-included ahead of the source (`-include`).
    pub force_include: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    /// Rename a `main` defined in the unit.
    pub rename_main: bool,
}

/// Trait implemented by C toolchains able to build a variant executable.
pub trait Toolchain: Send + Sync {
    fn name(&self) -> &'static str;
    /// Return a version string, failing when the compiler is unusable.
    fn probe(&self) -> Result<String, ToolchainError>;
    fn compile_object(&self, source: &Path, output: &Path, options: &CompileOptions) -> Result<(), ToolchainError>;
    fn link(&self, objects: &[PathBuf], output: &Path) -> Result<(), ToolchainError>;
}

/// `cc`-compatible driver (gcc, clang, or anything accepting the same flags).
#[derive(Debug, Clone)]
pub struct CcToolchain {
    pub compiler: String,
    pub cflags: Vec<String>,
    pub link_flags: Vec<String>,
}

impl CcToolchain {
    pub fn new(compiler: impl Into<String>) -> Self {
        let defaults = HarnessConfig::default();
        Self { compiler: compiler.into(), cflags: defaults.cflags, link_flags: defaults.link_flags }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self { compiler: config.compiler.clone(), cflags: config.cflags.clone(), link_flags: config.link_flags.clone() }
    }

    fn run(&self, stage: &'static str, input: &Path, cmd: &mut Command) -> Result<(), ToolchainError> {
        debug!(compiler = %self.compiler, ?cmd, "{stage}");
        let output = cmd
            .output()
            .map_err(|source| ToolchainError::Spawn { compiler: self.compiler.clone(), source })?;
        if !output.status.success() {
            return Err(ToolchainError::Failed {
                stage,
                input: input.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

impl Toolchain for CcToolchain {
    fn name(&self) -> &'static str {
        "cc"
    }

    fn probe(&self) -> Result<String, ToolchainError> {
        let output = Command::new(&self.compiler)
            .arg("--version")
            .output()
            .map_err(|source| ToolchainError::Spawn { compiler: self.compiler.clone(), source })?;
        if !output.status.success() {
            return Err(ToolchainError::Probe(format!("{} --version exited with {}", self.compiler, output.status)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout.lines().next().map(str::trim).unwrap_or_default();
        if first.is_empty() {
            return Err(ToolchainError::Probe(format!("{} --version printed nothing", self.compiler)));
        }
        Ok(first.to_string())
    }

    fn compile_object(&self, source: &Path, output: &Path, options: &CompileOptions) -> Result<(), ToolchainError> {
        let mut cmd = Command::new(&self.compiler);
        cmd.args(&self.cflags).arg("-w");
        if options.rename_main {
            cmd.arg(MAIN_RENAME);
        }
        if let Some(header) = &options.force_include {
            cmd.arg("-include").arg(header);
        }
        for dir in &options.include_dirs {
            cmd.arg("-I").arg(dir);
        }
        cmd.arg("-c").arg(source).arg("-o").arg(output);
        self.run("compile", source, &mut cmd)
    }

    fn link(&self, objects: &[PathBuf], output: &Path) -> Result<(), ToolchainError> {
        let mut cmd = Command::new(&self.compiler);
        cmd.args(objects).arg("-o").arg(output).args(&self.link_flags);
        self.run("link", output, &mut cmd)
    }
}
