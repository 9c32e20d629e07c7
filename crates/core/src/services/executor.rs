//! Builds both variants of a case and runs them against identical argument sets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::compat::{render_header, HEADER_FILE_NAME};
use crate::config::HarnessConfig;
use crate::corpus::CasePair;
use crate::inputs::{ArgValue, ArgumentSet};
use crate::model::{ByteRange, ReferenceCase};
use crate::services::driver::{render_driver, DRIVER_FILE_NAME, GUARD_BYTE};
use crate::services::protocol::{encode_arguments, parse_output, ProtocolError, ReturnValue};
use crate::services::sandbox::{run_sandboxed, ProcessOutcome, SandboxLimits};
use crate::services::toolchain::{CompileOptions, Toolchain, ToolchainError};

/// Setup failures that abort the whole run.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("harness driver for '{case}' failed to build (malformed signature?): {source}")]
    Driver { case: String, source: ToolchainError },
    #[error("toolchain unavailable: {0}")]
    Toolchain(ToolchainError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("failed to launch {}: {source}", .program.display())]
    Launch { program: PathBuf, source: std::io::Error },
}

/// Which side of a case pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Original,
    Decompiled,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Decompiled => "decompiled",
        }
    }
}

/// Byte capture of one mutable pointer argument around the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub param: usize,
    pub name: String,
    /// Bytes owned by the argument; everything after it is guard redzone.
    pub logical_len: usize,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
    pub ignore: Vec<ByteRange>,
}

impl AggregateSnapshot {
    /// Whether byte `index` takes part in comparisons.
    pub fn is_observed(&self, index: usize) -> bool {
        index >= self.logical_len || !self.ignore.iter().any(|r| r.contains(index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    Signal(i32),
    /// Exited before the driver finished reporting.
    Exit(i32),
    Timeout,
    /// Completed, but the report could not be decoded.
    Protocol(String),
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::Signal(sig) => write!(f, "killed by signal {sig}"),
            Fault::Exit(code) => write!(f, "exited early with status {code}"),
            Fault::Timeout => f.write_str("timed out"),
            Fault::Protocol(msg) => write!(f, "garbled report ({msg})"),
        }
    }
}

/// Observable result of running one variant on one argument set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    Completed { ret: ReturnValue, snapshots: Vec<AggregateSnapshot> },
    Faulted(Fault),
}

/// Executables built for one case.
#[derive(Debug, Clone)]
pub struct PreparedCase {
    pub case: ReferenceCase,
    pub original: PathBuf,
    pub decompiled: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Preparation {
    Ready(PreparedCase),
    CompileFailure { variant: Variant, stderr: String },
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Executed { original: Execution, decompiled: Execution },
    CompileFailure { variant: Variant, stderr: String },
}

/// Compiles and runs the original and decompiled variants of a case.
pub struct DualExecutor<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub config: &'a HarnessConfig,
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExecutorError> {
    fs::write(path, contents).map_err(|source| ExecutorError::Io { path: path.to_path_buf(), source })
}

/// Replace every spelling of `workdir` in compiler output with `<workdir>`.
///
/// Work directories are random, and compile-failure details end up in reports that must not
/// change between runs with the same seed.
pub fn mask_workdir(text: &str, workdir: &Path) -> String {
    let mut spellings = Vec::new();
    if let Ok(canonical) = workdir.canonicalize() {
        spellings.push(canonical.display().to_string());
    }
    spellings.push(workdir.display().to_string());
    spellings.sort_by_key(|s| std::cmp::Reverse(s.len()));
    spellings.dedup();

    let mut masked = text.to_string();
    for spelling in spellings.iter().filter(|s| !s.is_empty()) {
        masked = masked.replace(spelling.as_str(), "<workdir>");
    }
    masked
}

fn compile_failure(case: &str, variant: Variant, stderr: String) -> Preparation {
    warn!(case, variant = variant.as_str(), "variant failed to compile");
    Preparation::CompileFailure { variant, stderr }
}

impl<'a> DualExecutor<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, config: &'a HarnessConfig) -> Self {
        Self { toolchain, config }
    }

    fn limits(&self) -> SandboxLimits {
        SandboxLimits { timeout: self.config.timeout(), memory_bytes: self.config.memory_limit_bytes() }
    }

    /// Build one variant. `Ok(Err(stderr))` is a compile failure of the variant itself.
    fn build_variant(
        &self,
        variant: Variant,
        source: &Path,
        driver_obj: &Path,
        workdir: &Path,
    ) -> Result<Result<PathBuf, String>, ExecutorError> {
        let object = workdir.join(format!("{}.o", variant.as_str()));
        let exe = workdir.join(format!("{}.bin", variant.as_str()));
        let mut include_dirs: Vec<PathBuf> = source.parent().map(|p| vec![p.to_path_buf()]).unwrap_or_default();
        // Decompiled sources may `#include "recomp.h"` themselves.
        if variant == Variant::Decompiled {
            include_dirs.push(workdir.to_path_buf());
        }
        let options = CompileOptions {
            force_include: (variant == Variant::Decompiled).then(|| workdir.join(HEADER_FILE_NAME)),
            include_dirs,
            rename_main: true,
        };

        let built = self
            .toolchain
            .compile_object(source, &object, &options)
            .and_then(|_| self.toolchain.link(&[driver_obj.to_path_buf(), object.clone()], &exe));
        match built {
            Ok(()) => Ok(Ok(exe)),
            Err(ToolchainError::Failed { stage, stderr, .. }) => {
                Ok(Err(format!("{stage} failed: {}", mask_workdir(stderr.trim(), workdir))))
            }
            Err(other) => Err(ExecutorError::Toolchain(other)),
        }
    }

    /// Write header and driver into `workdir` and build both variants.
    pub fn prepare(&self, pair: &CasePair, workdir: &Path) -> Result<Preparation, ExecutorError> {
        let case_name = pair.case.name().to_string();
        write_file(&workdir.join(HEADER_FILE_NAME), &render_header())?;
        let driver_src = workdir.join(DRIVER_FILE_NAME);
        write_file(&driver_src, &render_driver(&pair.case.signature, self.config.guard_bytes))?;

        let driver_obj = workdir.join("eq_driver.o");
        self.toolchain
            .compile_object(&driver_src, &driver_obj, &CompileOptions::default())
            .map_err(|source| match source {
                ToolchainError::Failed { .. } => ExecutorError::Driver { case: case_name.clone(), source },
                other => ExecutorError::Toolchain(other),
            })?;

        let original = match self.build_variant(Variant::Original, &pair.original, &driver_obj, workdir)? {
            Ok(exe) => exe,
            Err(stderr) => return Ok(compile_failure(&case_name, Variant::Original, stderr)),
        };
        let decompiled = match self.build_variant(Variant::Decompiled, &pair.decompiled, &driver_obj, workdir)? {
            Ok(exe) => exe,
            Err(stderr) => return Ok(compile_failure(&case_name, Variant::Decompiled, stderr)),
        };
        debug!(case = %case_name, "variants built");
        Ok(Preparation::Ready(PreparedCase { case: pair.case.clone(), original, decompiled }))
    }

    fn execute(&self, program: &Path, case: &ReferenceCase, args: &ArgumentSet, stdin: &str) -> Result<Execution, ExecutorError> {
        let result = run_sandboxed(program, stdin.as_bytes(), &self.limits())
            .map_err(|source| ExecutorError::Launch { program: program.to_path_buf(), source })?;

        let output = match parse_output(&case.signature, &result.stdout) {
            Ok(output) => output,
            Err(ProtocolError::BadInput) => return Err(ExecutorError::Protocol(ProtocolError::BadInput)),
            Err(e) => {
                return Ok(match result.outcome {
                    ProcessOutcome::Exited(_) => Execution::Faulted(Fault::Protocol(e.to_string())),
                    ProcessOutcome::Signaled(sig) => Execution::Faulted(Fault::Signal(sig)),
                    ProcessOutcome::TimedOut => Execution::Faulted(Fault::Timeout),
                })
            }
        };

        let code = match result.outcome {
            ProcessOutcome::TimedOut => return Ok(Execution::Faulted(Fault::Timeout)),
            ProcessOutcome::Signaled(sig) => return Ok(Execution::Faulted(Fault::Signal(sig))),
            ProcessOutcome::Exited(code) => code,
        };
        let Some(ret) = output.ret.filter(|_| output.completed) else {
            return Ok(Execution::Faulted(Fault::Exit(code)));
        };

        let mut snapshots = Vec::new();
        for (index, param) in case.signature.params.iter().enumerate() {
            if !(param.ty.is_pointer() && param.ty.is_mutable()) {
                continue;
            }
            let Some(before) = args.values.get(index).and_then(ArgValue::pointee_bytes) else {
                continue;
            };
            let Some((_, after)) = output.memory.iter().find(|(i, _)| *i == index) else {
                return Ok(Execution::Faulted(Fault::Protocol(format!("no memory report for '{}'", param.name))));
            };
            let logical_len = before.len();
            let mut before = before;
            before.extend(std::iter::repeat(GUARD_BYTE).take(self.config.guard_bytes));
            snapshots.push(AggregateSnapshot {
                param: index,
                name: param.name.clone(),
                logical_len,
                before,
                after: after.clone(),
                ignore: param.ignore.clone(),
            });
        }

        Ok(Execution::Completed { ret, snapshots })
    }

    /// Execute both prepared variants on `args`.
    pub fn run(&self, prepared: &PreparedCase, args: &ArgumentSet) -> Result<(Execution, Execution), ExecutorError> {
        let stdin = encode_arguments(&prepared.case.signature, args)?;
        let original = self.execute(&prepared.original, &prepared.case, args, &stdin)?;
        let decompiled = self.execute(&prepared.decompiled, &prepared.case, args, &stdin)?;
        Ok((original, decompiled))
    }

    /// `prepare` followed by a single `run`.
    pub fn run_once(&self, pair: &CasePair, args: &ArgumentSet, workdir: &Path) -> Result<RunOutcome, ExecutorError> {
        match self.prepare(pair, workdir)? {
            Preparation::CompileFailure { variant, stderr } => Ok(RunOutcome::CompileFailure { variant, stderr }),
            Preparation::Ready(prepared) => {
                let (original, decompiled) = self.run(&prepared, args)?;
                Ok(RunOutcome::Executed { original, decompiled })
            }
        }
    }
}
