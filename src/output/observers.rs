//! Built-in visit observers

use crate::materializer::Visit;
use crate::output::traits::VisitObserver;
use crate::state::VisitOutcome;
use crate::url::CrawlTarget;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Logs every visit through `tracing`
///
/// Successful visits are logged at debug level, per-target failures at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl VisitObserver for LoggingObserver {
    fn on_visit(&self, worker: usize, visit: &Visit) {
        let outcome = visit.outcome();
        if outcome.is_error() {
            tracing::warn!(
                "[worker {}] {} -> {} ({})",
                worker,
                visit.target,
                visit.status,
                outcome
            );
        } else {
            match &visit.file {
                Some(file) => tracing::debug!(
                    "[worker {}] {} -> {} ({})",
                    worker,
                    visit.target,
                    visit.status,
                    file.display()
                ),
                None => tracing::debug!("[worker {}] {} -> {}", worker, visit.target, visit.status),
            }
        }
    }

    fn on_rejected(&self, worker: usize, target: &CrawlTarget) {
        tracing::debug!("[worker {}] Host not allowed, skipping {}", worker, target);
    }
}

/// Live outcome counts shared across workers
#[derive(Debug, Default)]
pub struct StatsObserver {
    counts: Mutex<Counts>,
}

#[derive(Debug, Default, Clone)]
struct Counts {
    by_outcome: BTreeMap<VisitOutcome, u64>,
    by_worker: BTreeMap<usize, u64>,
    rejected: u64,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total visits seen so far
    pub fn total(&self) -> u64 {
        self.with_counts(|counts| counts.by_outcome.values().sum())
    }

    pub fn by_outcome(&self) -> BTreeMap<VisitOutcome, u64> {
        self.with_counts(|counts| counts.by_outcome.clone())
    }

    pub fn by_worker(&self) -> BTreeMap<usize, u64> {
        self.with_counts(|counts| counts.by_worker.clone())
    }

    pub fn rejected(&self) -> u64 {
        self.with_counts(|counts| counts.rejected)
    }

    fn with_counts<T>(&self, f: impl FnOnce(&mut Counts) -> T) -> T {
        // Counting cannot leave the map half-updated, so a poisoned lock is still usable
        let mut counts = match self.counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut counts)
    }
}

impl VisitObserver for StatsObserver {
    fn on_visit(&self, worker: usize, visit: &Visit) {
        let outcome = visit.outcome();
        self.with_counts(|counts| {
            *counts.by_outcome.entry(outcome).or_insert(0) += 1;
            *counts.by_worker.entry(worker).or_insert(0) += 1;
        });
    }

    fn on_rejected(&self, _worker: usize, _target: &CrawlTarget) {
        self.with_counts(|counts| counts.rejected += 1);
    }
}
