use equiv_core::db::{DbError, HistoryDb, RunRecord, CURRENT_SCHEMA_VERSION};
use equiv_core::inputs::Provenance;
use equiv_core::model::Category;
use equiv_core::services::{Verdict, VerdictEntry};

fn record(seed: u64, passed: usize) -> RunRecord {
    RunRecord {
        started_at: "2026-01-01T00:00:00Z".into(),
        finished_at: "2026-01-01T00:00:05Z".into(),
        seed,
        count: 4,
        corpus_dir: "corpus".into(),
        decompiled_dir: Some("out/decompiled".into()),
        toolchain: Some("cc (test) 1.0".into()),
        report_hash: "ab".repeat(32),
        total: 3,
        passed,
    }
}

fn verdict(case: &str, set_index: usize, verdict: Verdict) -> VerdictEntry {
    VerdictEntry {
        case: case.into(),
        category: Category::Arithmetic,
        set_index,
        provenance: Provenance::Random,
        verdict,
        detail: (!verdict.is_pass()).then(|| "returned 1 vs 2".to_string()),
        arguments: "(1)".into(),
    }
}

#[test]
fn fresh_database_is_at_current_schema() {
    let db = HistoryDb::open_in_memory().unwrap();
    let version: i32 = db.connection().query_row("PRAGMA user_version;", [], |row| row.get(0)).unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
    assert!(db.list_runs().unwrap().is_empty());
    assert!(db.latest_run_ids(2).unwrap().is_empty());
}

#[test]
fn runs_and_verdicts_round_trip() {
    let db = HistoryDb::open_in_memory().unwrap();
    let entries = vec![
        verdict("divide_by_7", 0, Verdict::Equivalent),
        verdict("divide_by_7", 1, Verdict::ValueMismatch),
        verdict("modulo_3", 0, Verdict::EquivalentByFault),
    ];
    let id = db.record_run(&record(u64::MAX, 2), &entries).unwrap();

    let runs = db.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, id);
    assert_eq!(runs[0].record, record(u64::MAX, 2));
    assert_eq!(db.get_run(id).unwrap().map(|r| r.record.seed), Some(u64::MAX));
    assert!(db.get_run(id + 1).unwrap().is_none());

    let stored = db.load_verdicts(id).unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[1].case_name, "divide_by_7");
    assert_eq!(stored[1].set_index, 1);
    assert_eq!(stored[1].verdict, Verdict::ValueMismatch);
    assert_eq!(stored[1].provenance, Provenance::Random);
    assert_eq!(stored[1].detail.as_deref(), Some("returned 1 vs 2"));
    assert_eq!(stored[2].category, Category::Arithmetic);
}

#[test]
fn latest_run_ids_are_newest_first() {
    let db = HistoryDb::open_in_memory().unwrap();
    let first = db.record_run(&record(1, 3), &[]).unwrap();
    let second = db.record_run(&record(2, 3), &[]).unwrap();
    let third = db.record_run(&record(3, 3), &[]).unwrap();
    assert_eq!(db.latest_run_ids(2).unwrap(), vec![third, second]);
    assert_eq!(db.latest_run_ids(10).unwrap(), vec![third, second, first]);
}

#[test]
fn regressions_only_report_worsened_failures() {
    let db = HistoryDb::open_in_memory().unwrap();
    let base = db
        .record_run(
            &record(0, 2),
            &[
                verdict("a", 0, Verdict::Equivalent),
                verdict("a", 1, Verdict::ValueMismatch),
                verdict("b", 0, Verdict::CrashMismatch),
            ],
        )
        .unwrap();
    let head = db
        .record_run(
            &record(0, 1),
            &[
                verdict("a", 0, Verdict::SideEffectMismatch),
                verdict("a", 1, Verdict::ValueMismatch),
                verdict("b", 0, Verdict::Timeout),
                verdict("c", 0, Verdict::CompileFailure),
                verdict("d", 0, Verdict::EquivalentByFault),
            ],
        )
        .unwrap();

    let regressions = db.regressions(base, head).unwrap();
    let found: Vec<(&str, usize, Verdict, Verdict)> =
        regressions.iter().map(|r| (r.case_name.as_str(), r.set_index, r.base, r.head)).collect();
    assert_eq!(
        found,
        vec![
            ("a", 0, Verdict::Equivalent, Verdict::SideEffectMismatch),
            ("c", 0, Verdict::Equivalent, Verdict::CompileFailure),
        ]
    );

    assert!(db.regressions(head, head).unwrap().is_empty());
}

#[test]
fn unknown_run_is_an_error() {
    let db = HistoryDb::open_in_memory().unwrap();
    assert!(matches!(db.load_verdicts(42), Err(DbError::UnknownRun(42))));
    assert!(matches!(db.regressions(1, 2), Err(DbError::UnknownRun(1))));
}

#[test]
fn reopening_keeps_history_and_rejects_newer_schema() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("history.db");

    let id = {
        let db = HistoryDb::open(&path).unwrap();
        db.record_run(&record(9, 3), &[verdict("a", 0, Verdict::Equivalent)]).unwrap()
    };
    {
        let db = HistoryDb::open(&path).unwrap();
        assert_eq!(db.load_verdicts(id).unwrap().len(), 1);
        db.connection().execute_batch("PRAGMA user_version = 99;").unwrap();
    }

    let err = HistoryDb::open(&path).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { found: 99, .. }));
}
