//! Observer trait and crawl summary types
//!
//! This module defines the hook the scheduler calls for every visit and the
//! per-worker and whole-crawl summaries built from those visits.

use crate::materializer::Visit;
use crate::state::VisitOutcome;
use crate::url::CrawlTarget;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Receives crawl events as they happen
///
/// Observers are shared by every worker, so implementations must be
/// thread-safe. They cannot influence the crawl.
pub trait VisitObserver: Send + Sync {
    /// Called once per materialized target, in the worker that visited it
    fn on_visit(&self, worker: usize, visit: &Visit);

    /// Called when a target is dropped by the host filter
    fn on_rejected(&self, _worker: usize, _target: &CrawlTarget) {}
}

/// What one worker did during a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker: usize,

    /// Targets materialized by this worker
    pub visits: u64,

    /// Targets dropped by the host filter
    pub rejected: u64,

    /// Targets skipped because their path was already claimed
    pub duplicates: u64,

    pub by_status: BTreeMap<u16, u64>,

    pub by_outcome: BTreeMap<VisitOutcome, u64>,

    /// Files written, in visit order
    pub files: Vec<PathBuf>,
}

impl WorkerSummary {
    pub fn new(worker: usize) -> Self {
        Self {
            worker,
            ..Self::default()
        }
    }

    /// Counts a finished visit
    pub fn record(&mut self, visit: &Visit) {
        self.visits += 1;
        *self.by_status.entry(visit.status).or_insert(0) += 1;
        *self.by_outcome.entry(visit.outcome()).or_insert(0) += 1;
        if visit.status == 200 {
            if let Some(file) = &visit.file {
                self.files.push(file.clone());
            }
        }
    }
}

/// Aggregate result of a whole crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Ledger run id, for parallel crawls
    pub run_id: Option<i64>,

    /// Number of workers that took part, including the first
    pub workers: usize,

    pub visits: u64,

    /// Distinct paths claimed across all workers
    pub distinct_paths: u64,

    pub rejected: u64,

    pub duplicates: u64,

    pub by_status: BTreeMap<u16, u64>,

    pub by_outcome: BTreeMap<VisitOutcome, u64>,

    /// Every file written, sorted
    pub files: Vec<PathBuf>,

    pub worker_summaries: Vec<WorkerSummary>,
}

impl CrawlReport {
    /// Builds a report from the summaries of every worker
    pub fn from_summaries(summaries: Vec<WorkerSummary>, distinct_paths: u64) -> Self {
        let mut report = Self {
            workers: summaries.len(),
            distinct_paths,
            ..Self::default()
        };

        for summary in &summaries {
            report.visits += summary.visits;
            report.rejected += summary.rejected;
            report.duplicates += summary.duplicates;
            for (status, count) in &summary.by_status {
                *report.by_status.entry(*status).or_insert(0) += count;
            }
            for (outcome, count) in &summary.by_outcome {
                *report.by_outcome.entry(*outcome).or_insert(0) += count;
            }
            report.files.extend(summary.files.iter().cloned());
        }

        report.files.sort();
        report.worker_summaries = summaries;
        report
    }

    /// Number of visits that ended with `status`
    pub fn status_count(&self, status: u16) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn outcome_count(&self, outcome: VisitOutcome) -> u64 {
        self.by_outcome.get(&outcome).copied().unwrap_or(0)
    }

    /// Visits that ended in a per-target failure (4xx, 5xx or a conflict)
    pub fn failures(&self) -> u64 {
        self.by_outcome
            .iter()
            .filter(|(outcome, _)| outcome.is_error())
            .map(|(_, count)| count)
            .sum()
    }
}
