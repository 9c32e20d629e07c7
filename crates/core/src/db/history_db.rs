use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::db::{Regression, RunRecord, StoredRun, StoredVerdict};
use crate::inputs::Provenance;
use crate::model::Category;
use crate::services::differ::Verdict;
use crate::services::report::VerdictEntry;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Error type for history database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    #[error("Run {0} not found")]
    UnknownRun(i64),

    /// A stored label no longer maps to a known value.
    #[error("Unrecognized {kind} '{value}' in history database")]
    Unrecognized { kind: &'static str, value: String },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed run history.
///
/// Keeps one row per harness run and one row per (case, argument set) verdict so runs can be
/// compared for regressions.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

const RUN_COLUMNS: &str = r#"
    SELECT id, started_at, finished_at, seed, count, corpus_dir, decompiled_dir, toolchain,
           report_hash, total, passed
    FROM runs
"#;

fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRun> {
    let seed: i64 = row.get(3)?;
    let count: i64 = row.get(4)?;
    let total: i64 = row.get(9)?;
    let passed: i64 = row.get(10)?;
    Ok(StoredRun {
        id: row.get(0)?,
        record: RunRecord {
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            seed: seed as u64,
            count: count as usize,
            corpus_dir: row.get(5)?,
            decompiled_dir: row.get(6)?,
            toolchain: row.get(7)?,
            report_hash: row.get(8)?,
            total: total as usize,
            passed: passed as usize,
        },
    })
}

fn unrecognized(kind: &'static str, value: &str) -> DbError {
    DbError::Unrecognized { kind, value: value.to_string() }
}

impl HistoryDb {
    /// Open (or create) a history database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a run record and return its row id.
    pub fn insert_run(&self, record: &RunRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO runs (started_at, finished_at, seed, count, corpus_dir, decompiled_dir, toolchain,
                              report_hash, total, passed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.started_at,
                record.finished_at,
                record.seed as i64,
                record.count as i64,
                record.corpus_dir,
                record.decompiled_dir,
                record.toolchain,
                record.report_hash,
                record.total as i64,
                record.passed as i64
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Persist every verdict of a run in one transaction.
    pub fn insert_verdicts(&self, run_id: i64, entries: &[VerdictEntry]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO verdicts (run_id, case_name, category, set_index, provenance, verdict, detail)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for e in entries {
                stmt.execute(params![
                    run_id,
                    e.case,
                    e.category.as_str(),
                    e.set_index as i64,
                    e.provenance.as_str(),
                    e.verdict.as_str(),
                    e.detail
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert the run and its verdicts; returns the run id.
    pub fn record_run(&self, record: &RunRecord, entries: &[VerdictEntry]) -> DbResult<i64> {
        let id = self.insert_run(record)?;
        self.insert_verdicts(id, entries)?;
        Ok(id)
    }

    /// List all runs (ordered by id).
    pub fn list_runs(&self) -> DbResult<Vec<StoredRun>> {
        let mut stmt = self.conn.prepare(&format!("{RUN_COLUMNS} ORDER BY id"))?;
        let rows = stmt.query_map([], map_run)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_run(&self, id: i64) -> DbResult<Option<StoredRun>> {
        let mut stmt = self.conn.prepare(&format!("{RUN_COLUMNS} WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(map_run(row)?))
        } else {
            Ok(None)
        }
    }

    /// Ids of the most recent `limit` runs, newest first.
    pub fn latest_run_ids(&self, limit: usize) -> DbResult<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM runs ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, i64>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Verdicts of a run in (case, set) order as inserted.
    pub fn load_verdicts(&self, run_id: i64) -> DbResult<Vec<StoredVerdict>> {
        if self.get_run(run_id)?.is_none() {
            return Err(DbError::UnknownRun(run_id));
        }
        let mut stmt = self.conn.prepare(
            r#"
            SELECT case_name, category, set_index, provenance, verdict, detail
            FROM verdicts
            WHERE run_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (case_name, category, set_index, provenance, verdict, detail) = row?;
            out.push(StoredVerdict {
                category: Category::from_label(&category).ok_or_else(|| unrecognized("category", &category))?,
                provenance: Provenance::from_label(&provenance)
                    .ok_or_else(|| unrecognized("provenance", &provenance))?,
                verdict: Verdict::from_label(&verdict).ok_or_else(|| unrecognized("verdict", &verdict))?,
                case_name,
                set_index: set_index as usize,
                detail,
            });
        }
        Ok(out)
    }

    /// Argument sets whose verdict in `head` is failing and more severe than in `base`.
    ///
    /// Sets present only in `head` count against a passing baseline.
    pub fn regressions(&self, base: i64, head: i64) -> DbResult<Vec<Regression>> {
        let baseline: HashMap<(String, usize), Verdict> = self
            .load_verdicts(base)?
            .into_iter()
            .map(|v| ((v.case_name, v.set_index), v.verdict))
            .collect();

        let mut out = Vec::new();
        for v in self.load_verdicts(head)? {
            if v.verdict.is_pass() {
                continue;
            }
            let before =
                baseline.get(&(v.case_name.clone(), v.set_index)).copied().unwrap_or(Verdict::Equivalent);
            if v.verdict.severity() > before.severity() {
                out.push(Regression {
                    case_name: v.case_name,
                    set_index: v.set_index,
                    base: before,
                    head: v.verdict,
                    detail: v.detail,
                });
            }
        }
        Ok(out)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: runs and verdicts tables
/// - 2: add toolchain column to runs, index verdicts by run
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS runs (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at     TEXT NOT NULL,
                finished_at    TEXT NOT NULL,
                seed           INTEGER NOT NULL,
                count          INTEGER NOT NULL,
                corpus_dir     TEXT NOT NULL,
                decompiled_dir TEXT,
                report_hash    TEXT NOT NULL,
                total          INTEGER NOT NULL,
                passed         INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS verdicts (
                run_id     INTEGER NOT NULL,
                case_name  TEXT NOT NULL,
                category   TEXT NOT NULL,
                set_index  INTEGER NOT NULL,
                provenance TEXT NOT NULL,
                verdict    TEXT NOT NULL,
                detail     TEXT,
                PRIMARY KEY(run_id, case_name, set_index)
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        if !column_exists(conn, "runs", "toolchain")? {
            conn.execute("ALTER TABLE runs ADD COLUMN toolchain TEXT;", [])?;
        }
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE INDEX IF NOT EXISTS verdicts_by_run ON verdicts(run_id);
            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let pragma = format!("PRAGMA table_info({table});");
    let mut stmt = conn.prepare(&pragma)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in rows {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}
