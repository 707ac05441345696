//! SQLite seen ledger
//!
//! The ledger file is opened separately by every worker. An exclusive
//! transaction provides the cross-worker lock, held only for the
//! read-then-append section of [`SeenLedger::claim`].

use crate::ledger::schema::initialize_schema;
use crate::ledger::traits::{LedgerError, LedgerResult, SeenLedger};
use crate::ledger::{LedgerEntry, RunRecord, RunStatus, SeenSet};
use chrono::Utc;
use rusqlite::{
    params, Connection, ErrorCode, OpenFlags, OptionalExtension, TransactionBehavior,
};
use std::path::Path;
use std::time::Duration;

/// SQLite-backed seen ledger handle for one worker
pub struct SqliteLedger {
    conn: Connection,
    run_id: i64,
    worker: usize,
    /// Highest entry id already merged into the local seen set
    cursor: i64,
}

impl SqliteLedger {
    /// Opens (or creates) the ledger file and starts a new run in it
    ///
    /// Used by the process that owns the crawl; workers attach with
    /// [`SqliteLedger::attach`].
    pub fn create_run(path: &Path, config_hash: &str, lock_timeout: Duration) -> LedgerResult<Self> {
        let conn = open_connection(path, lock_timeout)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )
        .map_err(lock_error)?;
        let run_id = conn.last_insert_rowid();

        tracing::debug!("Started ledger run {} in {}", run_id, path.display());

        Ok(Self {
            conn,
            run_id,
            worker: 0,
            cursor: 0,
        })
    }

    /// Attaches a worker handle to an existing run
    pub fn attach(
        path: &Path,
        run_id: i64,
        worker: usize,
        lock_timeout: Duration,
    ) -> LedgerResult<Self> {
        let conn = open_connection(path, lock_timeout)?;
        Ok(Self {
            conn,
            run_id,
            worker,
            cursor: 0,
        })
    }

    /// Opens an existing ledger file for inspection, attached to its latest run
    pub fn open_for_inspection(path: &Path) -> LedgerResult<Self> {
        // No CREATE flag: a missing ledger is an error rather than a new empty file
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let run_id = conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM runs", [], |row| row.get(0))?;
        Ok(Self {
            conn,
            run_id,
            worker: 0,
            cursor: 0,
        })
    }

    /// Creates an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, 'test', 'running')",
            params![Utc::now().to_rfc3339()],
        )?;
        let run_id = conn.last_insert_rowid();
        Ok(Self {
            conn,
            run_id,
            worker: 0,
            cursor: 0,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Marks the run finished and records how many distinct paths it claimed
    pub fn complete_run(&mut self, status: RunStatus) -> LedgerResult<u64> {
        let distinct = self.count()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, status = ?2, distinct_paths = ?3 WHERE id = ?4",
                params![now, status.to_db_string(), distinct as i64, self.run_id],
            )
            .map_err(lock_error)?;
        Ok(distinct)
    }

    pub fn get_run(&self, run_id: i64) -> LedgerResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, distinct_paths
                 FROM runs WHERE id = ?1",
                params![run_id],
                read_run,
            )
            .optional()?;
        Ok(run)
    }

    /// All runs recorded in the ledger, oldest first
    pub fn runs(&self) -> LedgerResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, distinct_paths
             FROM runs ORDER BY id",
        )?;
        let runs = stmt
            .query_map([], read_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Paths claimed in this handle's run, in claim order
    pub fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, worker, claimed_at FROM seen_paths WHERE run_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![self.run_id], |row| {
                Ok(LedgerEntry {
                    path: row.get(0)?,
                    worker: row.get::<_, i64>(1)? as usize,
                    claimed_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Number of paths each worker claimed in this handle's run
    pub fn count_by_worker(&self) -> LedgerResult<Vec<(usize, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT worker, COUNT(*) FROM seen_paths WHERE run_id = ?1
             GROUP BY worker ORDER BY worker",
        )?;
        let counts = stmt
            .query_map(params![self.run_id], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

impl SeenLedger for SqliteLedger {
    fn claim(&mut self, path: &str, seen: &mut SeenSet) -> LedgerResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(lock_error)?;

        let mut cursor = self.cursor;
        {
            let mut stmt = tx.prepare_cached(
                "SELECT id, path FROM seen_paths WHERE run_id = ?1 AND id > ?2 ORDER BY id",
            )?;
            let mut rows = stmt.query(params![self.run_id, cursor])?;
            while let Some(row) = rows.next()? {
                let id: i64 = row.get(0)?;
                let claimed: String = row.get(1)?;
                seen.merge(claimed);
                cursor = id;
            }
        }

        let unseen = !seen.contains(path);
        if unseen {
            tx.execute(
                "INSERT INTO seen_paths (run_id, path, worker, claimed_at) VALUES (?1, ?2, ?3, ?4)",
                params![self.run_id, path, self.worker as i64, Utc::now().to_rfc3339()],
            )?;
            cursor = tx.last_insert_rowid();
        }

        tx.commit().map_err(lock_error)?;

        self.cursor = cursor;
        seen.mark(path);
        tracing::trace!(
            "Worker {} reconciled ledger at entry {} ({} claimed: {})",
            self.worker,
            cursor,
            path,
            unseen
        );
        Ok(unseen)
    }

    fn count(&self) -> LedgerResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM seen_paths WHERE run_id = ?1",
            params![self.run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn open_connection(path: &Path, lock_timeout: Duration) -> LedgerResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    conn.busy_timeout(lock_timeout)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )
    .map_err(lock_error)?;
    initialize_schema(&conn).map_err(lock_error)?;
    Ok(conn)
}

fn read_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        distinct_paths: row.get::<_, Option<i64>>(5)?.map(|n| n as u64),
    })
}

/// Busy and locked errors mean another worker held the lock past the timeout
fn lock_error(e: rusqlite::Error) -> LedgerError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            LedgerError::Lock(e.to_string())
        }
        _ => LedgerError::Sqlite(e),
    }
}
