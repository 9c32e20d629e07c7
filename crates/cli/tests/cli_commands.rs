use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

fn shipped_corpus() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../corpus")
}

#[test]
fn header_prints_compat_layer() {
    cargo_bin_cmd!("decomp-equiv")
        .arg("header")
        .assert()
        .success()
        .stdout(predicate::str::contains("#ifndef DECOMP_EQUIV_RECOMP_H"))
        .stdout(predicate::str::contains("#define CONCAT44("));
}

#[test]
fn header_writes_to_out_path() {
    let temp = tempdir().unwrap();
    let out = temp.path().join("recomp.h");
    cargo_bin_cmd!("decomp-equiv")
        .args(["header", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote compatibility header to"));
    assert!(fs::read_to_string(&out).unwrap().contains("SUB84("));
}

#[test]
fn list_cases_shows_signatures_and_categories() {
    cargo_bin_cmd!("decomp-equiv")
        .args(["list-cases", "--corpus"])
        .arg(shipped_corpus())
        .assert()
        .success()
        .stdout(predicate::str::contains("- max3 [control_flow] max3(int4 a, int4 b, int4 c) -> int4"))
        .stdout(predicate::str::contains("Categories:"))
        .stdout(predicate::str::contains("- type_conversion: "));
}

#[test]
fn list_cases_json_is_parseable() {
    let output = cargo_bin_cmd!("decomp-equiv")
        .args(["list-cases", "--json", "--corpus"])
        .arg(shipped_corpus())
        .output()
        .unwrap();
    assert!(output.status.success());
    let cases: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = cases.as_array().unwrap().iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names.first(), Some(&"max3"));
    assert!(names.contains(&"tagged_bump"));
}

#[test]
fn list_cases_on_empty_manifest() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("corpus.yaml"), "cases: []\n").unwrap();
    cargo_bin_cmd!("decomp-equiv")
        .args(["list-cases", "--corpus"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cases: (none)"));
}

#[test]
fn inputs_lists_boundary_then_explicit_rows() {
    cargo_bin_cmd!("decomp-equiv")
        .args(["inputs", "--case", "gcd", "--count", "7", "--corpus"])
        .arg(shipped_corpus())
        .assert()
        .success()
        .stdout(predicate::str::contains("gcd(int4 a in 0..=1000000, int4 b in 0..=1000000) -> int4"))
        .stdout(predicate::str::contains("#0 boundary (0, 0)"))
        .stdout(predicate::str::contains("#5 explicit (48, 18)"))
        .stdout(predicate::str::contains("#6 explicit (17, 5)"));
}

#[test]
fn inputs_unknown_case_exits_with_error_status() {
    cargo_bin_cmd!("decomp-equiv")
        .args(["inputs", "--case", "no_such_case", "--corpus"])
        .arg(shipped_corpus())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown case 'no_such_case'"));
}

#[test]
fn run_requires_existing_decompiled_dir() {
    let temp = tempdir().unwrap();
    cargo_bin_cmd!("decomp-equiv")
        .args(["run", "--corpus"])
        .arg(shipped_corpus())
        .arg("--decompiled")
        .arg(temp.path().join("missing"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Decompiled directory not found"));
}

#[test]
fn run_fails_when_a_counterpart_is_missing() {
    let temp = tempdir().unwrap();
    cargo_bin_cmd!("decomp-equiv")
        .args(["run", "--corpus"])
        .arg(shipped_corpus())
        .arg("--decompiled")
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no decompiled counterpart for case 'max3'"));
}

#[test]
fn self_check_rejects_missing_corpus_manifest() {
    let temp = tempdir().unwrap();
    cargo_bin_cmd!("decomp-equiv")
        .args(["self-check", "--corpus"])
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no corpus manifest"));
}

#[test]
fn history_on_missing_database_fails() {
    let temp = tempdir().unwrap();
    cargo_bin_cmd!("decomp-equiv")
        .args(["history", "--db"])
        .arg(temp.path().join("history.db"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("History database not found"));
}
