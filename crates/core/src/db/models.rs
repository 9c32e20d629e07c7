use serde::{Deserialize, Serialize};

use crate::inputs::Provenance;
use crate::model::Category;
use crate::services::differ::Verdict;

/// Bookkeeping for one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: String,
    pub finished_at: String,
    pub seed: u64,
    pub count: usize,
    pub corpus_dir: String,
    /// `None` for a self-check run.
    pub decompiled_dir: Option<String>,
    /// Compiler version banner.
    pub toolchain: Option<String>,
    /// SHA-256 of the JSON report.
    pub report_hash: String,
    pub total: usize,
    pub passed: usize,
}

/// A run as read back from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRun {
    pub id: i64,
    #[serde(flatten)]
    pub record: RunRecord,
}

/// One persisted verdict row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVerdict {
    pub case_name: String,
    pub category: Category,
    pub set_index: usize,
    pub provenance: Provenance,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A (case, argument set) whose verdict got worse between two runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regression {
    pub case_name: String,
    pub set_index: usize,
    pub base: Verdict,
    pub head: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
