//! Pipeline services: build, execute, compare and report.

pub mod differ;
pub mod driver;
pub mod executor;
pub mod harness;
pub mod protocol;
pub mod report;
pub mod sandbox;
pub mod toolchain;

pub use differ::{compare, ComparePolicy, Comparison, Verdict};
pub use executor::{DualExecutor, Execution, ExecutorError, Fault, Variant};
pub use harness::{HarnessError, HarnessRunner, RunSummary};
pub use report::{render_text, summarize, Report, VerdictEntry};
pub use toolchain::{CcToolchain, Toolchain, ToolchainError};
