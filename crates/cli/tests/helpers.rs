use std::fs;

use decomp_equiv::{canonicalize_or_current, existing_dir};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_resolves_existing_path() {
    let tmp = tempdir().expect("tempdir");
    let nested = tmp.path().join("nested");
    fs::create_dir_all(&nested).expect("create nested");

    let result = canonicalize_or_current(&nested.to_string_lossy()).expect("canonicalize nested");
    assert_eq!(result, nested.canonicalize().expect("canonicalize nested"));
}

#[test]
fn canonicalize_or_current_joins_missing_relative_path_to_cwd() {
    let cwd = std::env::current_dir().expect("cwd");
    let result = canonicalize_or_current("does-not-exist/decompiled").expect("fallback path");
    assert_eq!(result, cwd.join("does-not-exist/decompiled"));
}

#[test]
fn existing_dir_rejects_missing_and_file_paths() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("missing");
    let err = existing_dir(&missing.to_string_lossy(), "Decompiled").unwrap_err();
    assert!(err.to_string().starts_with("Decompiled directory not found"), "unexpected error: {err}");

    let file = tmp.path().join("corpus.yaml");
    fs::write(&file, "cases: []\n").unwrap();
    assert!(existing_dir(&file.to_string_lossy(), "Corpus").is_err());

    let ok = existing_dir(&tmp.path().to_string_lossy(), "Corpus").expect("existing dir");
    assert_eq!(ok, tmp.path().canonicalize().unwrap());
}
