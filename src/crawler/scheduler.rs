//! Scheduler for walking the worklist of one worker
//!
//! This module handles:
//! - Seeding and ordering the worklist (FIFO, redirects jump the queue)
//! - Host filtering before a target can be claimed
//! - Dedup against the local seen set, reconciled with the shared ledger
//!   when one is attached
//! - Materializing each claimed target and expanding its links

use crate::app::Application;
use crate::config::OutputConfig;
use crate::crawler::parser::LinkExtractor;
use crate::ledger::{LedgerResult, SeenLedger, SeenSet};
use crate::materializer::{Materializer, Visit};
use crate::output::{VisitObserver, WorkerSummary};
use crate::url::{resolve_link, CrawlTarget, HostFilter};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Ordered queue of targets a worker still has to visit
///
/// Duplicate paths are removed after every expansion, keeping the first
/// occurrence; otherwise insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worklist {
    items: VecDeque<CrawlTarget>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the initial worklist from seed literals
    ///
    /// Seeds that cannot be parsed are logged and skipped. With no seeds at
    /// all the crawl starts from `/`.
    pub fn seeded(seeds: &[String]) -> Self {
        let mut worklist = Self::new();

        if seeds.is_empty() {
            worklist.push_back(CrawlTarget::root());
            return worklist;
        }

        for seed in seeds {
            match CrawlTarget::parse(seed) {
                Ok(target) => worklist.push_back(target),
                Err(e) => tracing::warn!("Skipping seed {:?}: {}", seed, e),
            }
        }
        worklist.dedup();
        worklist
    }

    pub fn push_back(&mut self, target: CrawlTarget) {
        self.items.push_back(target);
    }

    pub fn push_front(&mut self, target: CrawlTarget) {
        self.items.push_front(target);
    }

    pub fn pop_front(&mut self) -> Option<CrawlTarget> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrawlTarget> {
        self.items.iter()
    }

    /// Removes later targets whose path already occurs earlier in the list
    pub fn dedup(&mut self) {
        let mut paths = HashSet::new();
        self.items.retain(|target| paths.insert(target.path.clone()));
    }

    /// Moves the back half of the list (rounded down) into a new worklist
    pub fn split_off_half(&mut self) -> Worklist {
        let keep = self.items.len() - self.items.len() / 2;
        Worklist {
            items: self.items.split_off(keep),
        }
    }

    /// Appends every target of `other` to the back, preserving its order
    pub fn append(&mut self, mut other: Worklist) {
        self.items.append(&mut other.items);
    }
}

impl FromIterator<CrawlTarget> for Worklist {
    fn from_iter<I: IntoIterator<Item = CrawlTarget>>(iter: I) -> Self {
        Worklist {
            items: iter.into_iter().collect(),
        }
    }
}

/// Everything a worker needs besides its own worklist and ledger handle
///
/// One context is shared by all workers of a crawl.
pub struct CrawlContext {
    pub app: Arc<dyn Application>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub observers: Vec<Arc<dyn VisitObserver>>,
    pub filter: HostFilter,
    pub follow_links: bool,
    pub output: OutputConfig,
}

/// Walks one worker's worklist until it is empty
pub struct Scheduler {
    worker: usize,
    context: Arc<CrawlContext>,
    materializer: Materializer,
    worklist: Worklist,
    seen: SeenSet,
    ledger: Option<Box<dyn SeenLedger>>,
    summary: WorkerSummary,
}

impl Scheduler {
    /// Creates a scheduler for `worker`
    ///
    /// Without a ledger, dedup only consults the local seen set.
    pub fn new(
        worker: usize,
        context: Arc<CrawlContext>,
        worklist: Worklist,
        ledger: Option<Box<dyn SeenLedger>>,
    ) -> Self {
        let materializer = Materializer::from_config(&context.output);
        Self {
            worker,
            context,
            materializer,
            worklist,
            seen: SeenSet::new(),
            ledger,
            summary: WorkerSummary::new(worker),
        }
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn worklist(&self) -> &Worklist {
        &self.worklist
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn summary(&self) -> &WorkerSummary {
        &self.summary
    }

    pub fn into_summary(self) -> WorkerSummary {
        self.summary
    }

    /// Runs until the worklist is empty
    ///
    /// Per-target failures are recorded and skipped; only a ledger error
    /// stops the worker.
    pub fn run(&mut self) -> LedgerResult<()> {
        self.run_with(|_| {})
    }

    /// Runs until the worklist is empty, calling `after_claim` each time a
    /// target has been claimed and before it is visited
    ///
    /// The hook may take targets off the worklist (to hand them to another
    /// worker) or put them back.
    pub fn run_with<F>(&mut self, mut after_claim: F) -> LedgerResult<()>
    where
        F: FnMut(&mut Worklist),
    {
        tracing::debug!(
            "Worker {} starting with {} target(s)",
            self.worker,
            self.worklist.len()
        );
        let start_time = Instant::now();

        while let Some(target) = self.worklist.pop_front() {
            if !self.context.filter.allows(&target) {
                self.summary.rejected += 1;
                for observer in &self.context.observers {
                    observer.on_rejected(self.worker, &target);
                }
                continue;
            }

            if !self.claim(&target.path)? {
                tracing::trace!("Worker {} skipping seen path {}", self.worker, target.path);
                self.summary.duplicates += 1;
                continue;
            }

            after_claim(&mut self.worklist);

            let visit = self
                .materializer
                .materialize(self.context.app.as_ref(), &target);
            self.summary.record(&visit);
            for observer in &self.context.observers {
                observer.on_visit(self.worker, &visit);
            }

            match visit.status {
                200 if self.context.follow_links => self.expand(&visit),
                301 => self.redirect(&visit),
                _ => {}
            }

            // Progress reporting every 10 visits
            if self.summary.visits % 10 == 0 {
                let elapsed = start_time.elapsed();
                let rate = self.summary.visits as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
                tracing::info!(
                    "Worker {} progress: {} visited, {} queued, {:.2} visits/sec",
                    self.worker,
                    self.summary.visits,
                    self.worklist.len(),
                    rate
                );
            }
        }

        tracing::debug!(
            "Worker {} finished: {} visited, {} duplicates, {} rejected",
            self.worker,
            self.summary.visits,
            self.summary.duplicates,
            self.summary.rejected
        );
        Ok(())
    }

    /// Marks `path` as seen, returning true if this worker should visit it
    fn claim(&mut self, path: &str) -> LedgerResult<bool> {
        match self.ledger.as_mut() {
            Some(ledger) => ledger.claim(path, &mut self.seen),
            None => Ok(self.seen.mark(path)),
        }
    }

    /// Queues the unseen links of a successful visit at the back
    fn expand(&mut self, visit: &Visit) {
        let links = self.context.extractor.extract(visit);
        let mut queued = 0;

        for link in links {
            if let Some(next) = resolve_link(&link, &visit.target) {
                if !self.seen.contains(&next.path) {
                    self.worklist.push_back(next);
                    queued += 1;
                }
            }
        }

        if queued > 0 {
            self.worklist.dedup();
            tracing::trace!("Queued {} link(s) from {}", queued, visit.target);
        }
    }

    /// Queues a permanent redirect's location ahead of everything else
    fn redirect(&mut self, visit: &Visit) {
        let location = match visit.location() {
            Some(location) => location,
            None => {
                tracing::warn!("{} redirected without a Location header", visit.target);
                return;
            }
        };

        match resolve_link(location, &visit.target) {
            Some(next) => {
                tracing::debug!("{} redirects to {}", visit.target, next);
                self.worklist.push_front(next);
                self.worklist.dedup();
            }
            None => tracing::warn!(
                "Ignoring unusable redirect from {} to {:?}",
                visit.target,
                location
            ),
        }
    }
}
