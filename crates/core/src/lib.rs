//! equiv-core
//!
//! Core library of the decompiler equivalence harness.
//!
//! It holds the compatibility vocabulary for decompiler-emitted C, the reference corpus model,
//! deterministic input generation, the dual-variant executor, the differ, report aggregation,
//! and the run history database.
//!
//! All substantive logic lives here so it is testable without the CLI frontend.

pub mod compat;
pub mod config;
pub mod corpus;
pub mod db;
pub mod inputs;
pub mod model;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
