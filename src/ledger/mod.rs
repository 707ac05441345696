//! Seen-path bookkeeping for a crawl run
//!
//! This module handles:
//! - The per-worker `SeenSet` the scheduler dedups against
//! - The `SeenLedger` trait for the dedup record shared between workers
//! - A SQLite ledger file (lock-guarded, append-only, auditable)
//! - An in-memory ledger for single-process sharing and tests

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{LedgerError, LedgerResult, SeenLedger};

use std::collections::HashMap;

/// Paths one worker knows to be visited, with how often it met each one
///
/// Paths are only ever added. A path merged in from the shared ledger has a
/// count of zero until this worker runs into it itself.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    visits: HashMap<String, u32>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.visits.contains_key(path)
    }

    /// Records an encounter with `path`, returning true if it was unseen
    pub fn mark(&mut self, path: &str) -> bool {
        match self.visits.get_mut(path) {
            Some(count) => {
                *count += 1;
                false
            }
            None => {
                self.visits.insert(path.to_string(), 1);
                true
            }
        }
    }

    /// Adds a path claimed elsewhere without counting an encounter
    pub fn merge(&mut self, path: String) {
        self.visits.entry(path).or_insert(0);
    }

    /// How many times this worker ran into `path`
    pub fn visits(&self, path: &str) -> u32 {
        self.visits.get(path).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

/// A claimed path as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub path: String,
    pub worker: usize,
    pub claimed_at: String,
}

/// Represents a crawl run recorded in the ledger
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub distinct_paths: Option<u64>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
