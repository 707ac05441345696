//! Ledger traits and error types
//!
//! This module defines the trait interface shared dedup ledgers implement and
//! the errors they raise. Any ledger error is fatal to the worker that hit it.

use crate::ledger::SeenSet;
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Could not acquire the ledger lock: {0}")]
    Lock(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger poisoned by a panicking worker")]
    Poisoned,
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A dedup record shared by every worker of a crawl run
///
/// Each worker holds its own handle. The only mutating operation is
/// [`SeenLedger::claim`], which runs the whole reconciliation under one
/// exclusive lock:
///
/// 1. read every entry appended since this handle last read, merging them
///    into the worker's local [`SeenSet`]
/// 2. if `path` is still unseen, append it
/// 3. release the lock
///
/// The local set is only ever updated from the ledger, never the reverse.
pub trait SeenLedger: Send {
    /// Reconciles `seen` with the ledger and claims `path` if nobody has
    ///
    /// Returns `true` if this worker now owns `path` and must visit it.
    fn claim(&mut self, path: &str, seen: &mut SeenSet) -> LedgerResult<bool>;

    /// Number of distinct paths claimed so far by all workers
    fn count(&self) -> LedgerResult<u64>;
}
