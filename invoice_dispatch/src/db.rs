//! SQLite ledger of dispatch runs.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::report::StatusReport;

const SCHEMA_VERSION: i32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
}

pub struct Db {
    conn: Connection,
}

/// One recorded run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunRow {
    pub run_id: i64,
    pub generated_at: DateTime<FixedOffset>,
    pub dry_run: bool,
    pub total: i64,
    pub sent: i64,
    pub planned: i64,
    pub errors: i64,
    pub report_path: Option<String>,
}

/// One entity line of a recorded run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunEntryRow {
    pub position: i64,
    pub entity: String,
    pub entity_key: String,
    pub documents: Vec<String>,
    pub matched_name: Option<String>,
    pub match_type: Option<String>,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub status: String,
    pub reason: Option<String>,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }

    /// Store a finished run with all its entries. Returns the new run id.
    pub fn record_run(&mut self, report: &StatusReport, report_path: Option<&Path>) -> Result<i64, DbError> {
        let summary = report.summary();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (generated_at, dry_run, total, sent, planned, errors, report_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                report.generated_at.to_rfc3339(),
                report.dry_run,
                summary.total as i64,
                summary.sent as i64,
                summary.planned as i64,
                summary.errors as i64,
                report_path.map(|p| p.display().to_string()),
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO run_entries (
                    run_id, position, entity, entity_key, documents, matched_name,
                    match_type, recipients, cc, status, reason
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, entry) in report.entries.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    entry.entity,
                    entry.key,
                    serde_json::to_string(&entry.documents)?,
                    entry.matched_name,
                    entry.match_type.map(|m| m.to_string()),
                    serde_json::to_string(&entry.to)?,
                    serde_json::to_string(&entry.cc)?,
                    entry.status.kind(),
                    entry.status.reason(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// Most recent runs first.
    pub fn list_runs(&self, limit: Option<i64>) -> Result<Vec<RunRow>, DbError> {
        let mut sql = String::from(
            "SELECT run_id, generated_at, dry_run, total, sent, planned, errors, report_path
             FROM runs
             ORDER BY run_id DESC",
        );
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (run_id, generated_at, dry_run, total, sent, planned, errors, report_path) = row?;
            result.push(RunRow {
                run_id,
                generated_at: DateTime::parse_from_rfc3339(&generated_at)?,
                dry_run,
                total,
                sent,
                planned,
                errors,
                report_path,
            });
        }
        Ok(result)
    }

    pub fn run_exists(&self, run_id: i64) -> Result<bool, DbError> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT run_id FROM runs WHERE run_id = ?1", params![run_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Entries of one run, in report order.
    pub fn run_entries(&self, run_id: i64) -> Result<Vec<RunEntryRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT position, entity, entity_key, documents, matched_name, match_type,
                    recipients, cc, status, reason
             FROM run_entries
             WHERE run_id = ?1
             ORDER BY position",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, Option<String>>(9)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (position, entity, entity_key, documents, matched_name, match_type, recipients, cc, status, reason) =
                row?;
            result.push(RunEntryRow {
                position,
                entity,
                entity_key,
                documents: serde_json::from_str(&documents)?,
                matched_name,
                match_type,
                recipients: serde_json::from_str(&recipients)?,
                cc: serde_json::from_str(&cc)?,
                status,
                reason,
            });
        }
        Ok(result)
    }

    pub fn run_count(&self) -> Result<i64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM runs", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DispatchStatus, StatusEntry};
    use entity_matcher::MatchType;

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        db
    }

    fn get_user_version(db: &Db) -> i32 {
        db.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("read user_version")
    }

    fn sample_report() -> StatusReport {
        let mut report = StatusReport::new(false);
        report.push(StatusEntry {
            entity: "Hospital Central Ltda".to_string(),
            key: "HOSPITAL CENTRAL".to_string(),
            documents: vec!["a.pdf".to_string(), "b.pdf".to_string()],
            matched_name: Some("Hospital Central".to_string()),
            match_type: Some(MatchType::Containment),
            to: vec!["fin@central.com".to_string()],
            cc: vec!["cc@central.com".to_string()],
            status: DispatchStatus::Sent,
        });
        report.push(StatusEntry {
            entity: "Clinica Aurora".to_string(),
            key: "CLINICA AURORA".to_string(),
            documents: vec!["c.pdf".to_string()],
            matched_name: None,
            match_type: None,
            to: Vec::new(),
            cc: Vec::new(),
            status: DispatchStatus::NoRecipients,
        });
        report
    }

    #[test]
    fn test_init_idempotent() {
        let db = open_test_db();
        db.init().expect("second init");
        assert_eq!(get_user_version(&db), SCHEMA_VERSION);
    }

    #[test]
    fn test_record_and_list_runs() {
        let mut db = open_test_db();
        let report = sample_report();
        let first = db.record_run(&report, Some(Path::new("/tmp/report.md"))).unwrap();
        let second = db.record_run(&report, None).unwrap();
        assert!(second > first);
        assert_eq!(db.run_count().unwrap(), 2);

        let runs = db.list_runs(None).unwrap();
        assert_eq!(runs[0].run_id, second);
        assert_eq!(runs[1].report_path.as_deref(), Some("/tmp/report.md"));
        assert_eq!(runs[1].total, 2);
        assert_eq!(runs[1].sent, 1);
        assert_eq!(runs[1].errors, 1);
        assert!(!runs[1].dry_run);
        assert_eq!(runs[1].generated_at.timestamp(), report.generated_at.timestamp());

        assert_eq!(db.list_runs(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_run_entries_round_trip() {
        let mut db = open_test_db();
        let run_id = db.record_run(&sample_report(), None).unwrap();

        let entries = db.run_entries(run_id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entity, "Hospital Central Ltda");
        assert_eq!(entries[0].documents, vec!["a.pdf", "b.pdf"]);
        assert_eq!(entries[0].match_type.as_deref(), Some("containment"));
        assert_eq!(entries[0].status, "sent");
        assert_eq!(entries[1].status, "no_recipients");
        assert!(entries[1].recipients.is_empty());
    }

    #[test]
    fn test_run_exists() {
        let mut db = open_test_db();
        let run_id = db.record_run(&sample_report(), None).unwrap();
        assert!(db.run_exists(run_id).unwrap());
        assert!(!db.run_exists(run_id + 100).unwrap());
    }

    #[test]
    fn test_failed_reason_stored() {
        let mut db = open_test_db();
        let mut report = StatusReport::new(true);
        report.push(StatusEntry {
            entity: "Santa Casa".to_string(),
            key: "SANTA CASA".to_string(),
            documents: vec!["d.pdf".to_string()],
            matched_name: Some("Santa Casa".to_string()),
            match_type: Some(MatchType::Exact),
            to: vec!["sc@example.com".to_string()],
            cc: Vec::new(),
            status: DispatchStatus::failed("outbox unavailable"),
        });
        let run_id = db.record_run(&report, None).unwrap();
        let entries = db.run_entries(run_id).unwrap();
        assert_eq!(entries[0].status, "failed");
        assert_eq!(entries[0].reason.as_deref(), Some("outbox unavailable"));
        assert!(db.list_runs(None).unwrap()[0].dry_run);
    }
}
