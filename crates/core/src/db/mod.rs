//! Run history database.
//!
//! This module wraps a SQLite database storing:
//! - one record per harness run (seed, inputs, report digest, totals)
//! - every verdict of that run, keyed by case and argument-set index
//!
//! Two runs can then be compared to list argument sets that regressed.

pub mod history_db;
pub mod models;

pub use history_db::{DbError, DbResult, HistoryDb, CURRENT_SCHEMA_VERSION};
pub use models::{Regression, RunRecord, StoredRun, StoredVerdict};
