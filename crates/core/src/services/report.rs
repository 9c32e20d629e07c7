//! Aggregation of verdicts into a deterministic report.
//!
//! Reports carry no timestamps or durations, so identical runs render byte-identical output.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::inputs::Provenance;
use crate::model::Category;
use crate::services::differ::Verdict;

/// Verdict for one (case, argument set) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictEntry {
    pub case: String,
    pub category: Category,
    pub set_index: usize,
    pub provenance: Provenance,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Rendered argument set.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCount {
    pub verdict: Verdict,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub cases: usize,
    pub total: usize,
    pub passed: usize,
    pub counts: Vec<VerdictCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub name: String,
    pub category: Category,
    pub total: usize,
    pub passed: usize,
    /// Most severe verdict seen for the case.
    pub worst: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Fraction of passing entries; 1.0 for an empty run.
    pub pass_rate: f64,
    pub counts: Vec<VerdictCount>,
    pub categories: Vec<CategorySummary>,
    pub cases: Vec<CaseSummary>,
    pub failures: Vec<VerdictEntry>,
}

impl Report {
    /// True iff every entry is `Equivalent` or `EquivalentByFault`.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.counts.iter().find(|c| c.verdict == verdict).map(|c| c.count).unwrap_or(0)
    }

    /// SHA-256 of the JSON rendering, used to identify identical runs.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let hash = Sha256::digest(&json);
        hash.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn tally(entries: &[&VerdictEntry]) -> Vec<VerdictCount> {
    Verdict::ALL
        .iter()
        .map(|v| VerdictCount { verdict: *v, count: entries.iter().filter(|e| e.verdict == *v).count() })
        .collect()
}

/// Summarize entries given in (registration, generation) order.
pub fn summarize(entries: &[VerdictEntry]) -> Report {
    let all: Vec<&VerdictEntry> = entries.iter().collect();
    let total = entries.len();
    let passed = entries.iter().filter(|e| e.verdict.is_pass()).count();

    let mut by_category: BTreeMap<Category, Vec<&VerdictEntry>> = BTreeMap::new();
    for e in entries {
        by_category.entry(e.category).or_default().push(e);
    }
    let categories = by_category
        .into_iter()
        .map(|(category, list)| {
            let mut names: Vec<&str> = list.iter().map(|e| e.case.as_str()).collect();
            names.dedup();
            CategorySummary {
                category,
                cases: names.len(),
                total: list.len(),
                passed: list.iter().filter(|e| e.verdict.is_pass()).count(),
                counts: tally(&list),
            }
        })
        .collect();

    let mut cases: Vec<CaseSummary> = Vec::new();
    for e in entries {
        match cases.last_mut() {
            Some(last) if last.name == e.case => {
                last.total += 1;
                last.passed += usize::from(e.verdict.is_pass());
                last.worst = last.worst.worst(e.verdict);
            }
            _ => cases.push(CaseSummary {
                name: e.case.clone(),
                category: e.category,
                total: 1,
                passed: usize::from(e.verdict.is_pass()),
                worst: e.verdict,
            }),
        }
    }

    Report {
        total,
        passed,
        failed: total - passed,
        pass_rate: if total == 0 { 1.0 } else { passed as f64 / total as f64 },
        counts: tally(&all),
        categories,
        cases,
        failures: entries.iter().filter(|e| !e.verdict.is_pass()).cloned().collect(),
    }
}

/// Human-readable rendering.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "decomp-equiv report");
    let _ = writeln!(
        out,
        "argument sets: {}  passed: {}  failed: {}  pass rate: {:.2}%",
        report.total,
        report.passed,
        report.failed,
        report.pass_rate * 100.0
    );

    out.push_str("\nverdicts:\n");
    for c in &report.counts {
        let _ = writeln!(out, "  {:<22} {}", c.verdict.as_str(), c.count);
    }

    out.push_str("\ncategories:\n");
    for c in &report.categories {
        let _ = writeln!(out, "  {:<22} {}/{} ({} cases)", c.category.as_str(), c.passed, c.total, c.cases);
    }

    out.push_str("\ncases:\n");
    for c in &report.cases {
        let _ = writeln!(out, "  {:<28} {:<18} {}/{}  {}", c.name, c.category.as_str(), c.passed, c.total, c.worst);
    }

    if !report.failures.is_empty() {
        out.push_str("\nfailures:\n");
        for f in &report.failures {
            let _ = writeln!(out, "  {} #{} [{}] {}: {}", f.case, f.set_index, f.provenance, f.verdict, f.arguments);
            if let Some(detail) = &f.detail {
                for line in detail.lines() {
                    let _ = writeln!(out, "      {line}");
                }
            }
        }
    }
    out
}
