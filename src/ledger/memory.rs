//! In-memory seen ledger
//!
//! Shares one mutex-guarded, append-only list of paths between handles in the
//! same process. Cloning a `MemoryLedger` gives another worker handle onto the
//! same list, with its own read cursor.

use crate::ledger::traits::{LedgerError, LedgerResult, SeenLedger};
use crate::ledger::SeenSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Arc<Mutex<Vec<String>>>,
    cursor: usize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every claimed path, in claim order
    pub fn entries(&self) -> LedgerResult<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(entries.clone())
    }
}

impl Clone for MemoryLedger {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            cursor: 0,
        }
    }
}

impl SeenLedger for MemoryLedger {
    fn claim(&mut self, path: &str, seen: &mut SeenSet) -> LedgerResult<bool> {
        let mut entries = self.entries.lock().map_err(|_| LedgerError::Poisoned)?;

        for entry in &entries[self.cursor..] {
            seen.merge(entry.clone());
        }

        let unseen = !seen.contains(path);
        if unseen {
            entries.push(path.to_string());
        }
        self.cursor = entries.len();
        drop(entries);

        seen.mark(path);
        Ok(unseen)
    }

    fn count(&self) -> LedgerResult<u64> {
        let entries = self.entries.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(entries.len() as u64)
    }
}
