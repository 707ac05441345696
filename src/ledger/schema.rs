//! Database schema definitions for the seen ledger

/// SQL schema for the ledger database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    distinct_paths INTEGER
);

-- Append-only log of claimed paths; rows are never updated or deleted
CREATE TABLE IF NOT EXISTS seen_paths (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    path TEXT NOT NULL,
    worker INTEGER NOT NULL,
    claimed_at TEXT NOT NULL,
    UNIQUE(run_id, path)
);

CREATE INDEX IF NOT EXISTS idx_seen_paths_run ON seen_paths(run_id, id);
"#;

/// Initializes the ledger schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
