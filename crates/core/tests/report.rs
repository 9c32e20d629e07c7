use equiv_core::inputs::Provenance;
use equiv_core::model::Category;
use equiv_core::services::{render_text, summarize, Verdict, VerdictEntry};

fn entry(case: &str, category: Category, set_index: usize, verdict: Verdict) -> VerdictEntry {
    VerdictEntry {
        case: case.into(),
        category,
        set_index,
        provenance: Provenance::Boundary,
        verdict,
        detail: (!verdict.is_pass()).then(|| format!("{case} diverged")),
        arguments: format!("#{set_index} boundary (0)"),
    }
}

fn sample() -> Vec<VerdictEntry> {
    vec![
        entry("max3", Category::ControlFlow, 0, Verdict::Equivalent),
        entry("max3", Category::ControlFlow, 1, Verdict::ValueMismatch),
        entry("gcd", Category::Recursion, 0, Verdict::EquivalentByFault),
        entry("gcd", Category::Recursion, 1, Verdict::CrashMismatch),
        entry("divide_by_7", Category::Arithmetic, 0, Verdict::Equivalent),
    ]
}

#[test]
fn empty_run_passes_with_zero_counts() {
    let report = summarize(&[]);
    assert_eq!(report.total, 0);
    assert_eq!(report.pass_rate, 1.0);
    assert!(report.all_passed());
    assert_eq!(report.counts.len(), Verdict::ALL.len());
    assert!(report.counts.iter().all(|c| c.count == 0));
    assert!(report.categories.is_empty());
}

#[test]
fn totals_and_verdict_counts() {
    let report = summarize(&sample());
    assert_eq!(report.total, 5);
    assert_eq!(report.passed, 3);
    assert_eq!(report.failed, 2);
    assert!((report.pass_rate - 0.6).abs() < 1e-12);
    assert!(!report.all_passed());
    assert_eq!(report.count(Verdict::Equivalent), 2);
    assert_eq!(report.count(Verdict::Timeout), 0);

    let order: Vec<Verdict> = report.counts.iter().map(|c| c.verdict).collect();
    assert_eq!(order, Verdict::ALL.to_vec());
}

#[test]
fn categories_sorted_and_cases_in_run_order() {
    let report = summarize(&sample());
    let categories: Vec<Category> = report.categories.iter().map(|c| c.category).collect();
    assert_eq!(categories, vec![Category::Arithmetic, Category::ControlFlow, Category::Recursion]);

    let cases: Vec<&str> = report.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cases, vec!["max3", "gcd", "divide_by_7"]);
    assert_eq!(report.cases[1].worst, Verdict::CrashMismatch);
    assert_eq!(report.cases[1].passed, 1);

    let failures: Vec<(&str, usize)> = report.failures.iter().map(|f| (f.case.as_str(), f.set_index)).collect();
    assert_eq!(failures, vec![("max3", 1), ("gcd", 1)]);
}

#[test]
fn digest_is_stable_and_content_sensitive() {
    let a = summarize(&sample());
    let b = summarize(&sample());
    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.digest().len(), 64);

    let mut changed = sample();
    changed[0].verdict = Verdict::Timeout;
    assert_ne!(a.digest(), summarize(&changed).digest());
}

#[test]
fn text_rendering_lists_failures_with_detail() {
    let text = render_text(&summarize(&sample()));
    assert!(text.starts_with("decomp-equiv report\n"));
    assert!(text.contains("argument sets: 5  passed: 3  failed: 2  pass rate: 60.00%"));
    assert!(text.contains("failures:"));
    assert!(text.contains("gcd #1 [boundary] crash_mismatch"));
    assert!(text.contains("      gcd diverged"));

    let clean = render_text(&summarize(&[]));
    assert!(!clean.contains("failures:"));
}

#[test]
fn report_serializes_to_json() {
    let report = summarize(&sample());
    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["total"], 5);
    assert_eq!(json["failures"][0]["verdict"], "value_mismatch");
    assert!(json["failures"][0].get("detail").is_some());
}
