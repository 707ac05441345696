//! Crawler coordinator - whole-crawl orchestration
//!
//! This module ties the pieces of a crawl together:
//! - Seeding the first worklist from configuration
//! - Running a single scheduler, or a parallel crawl where the first worker
//!   hands halves of its worklist to new worker threads
//! - Opening and closing the ledger run shared by parallel workers
//! - Waiting for spawned workers and aggregating the final report

use crate::app::Application;
use crate::config::{hash_content, load_seeds, Config};
use crate::crawler::join::{BoundedWait, JoinStrategy, MarkerDir, PollMarkers, WorkerHandle};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::scheduler::{CrawlContext, Scheduler, Worklist};
use crate::ledger::{LedgerResult, RunStatus, SqliteLedger};
use crate::output::{CrawlReport, LoggingObserver, VisitObserver, WorkerSummary};
use crate::url::HostFilter;
use crate::Result;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    app: Arc<dyn Application>,
    extractor: Arc<dyn LinkExtractor>,
    observers: Vec<Arc<dyn VisitObserver>>,
    join_strategy: Option<Box<dyn JoinStrategy>>,
    config_hash: Option<String>,
}

impl Coordinator {
    /// Creates a coordinator that crawls `app` as described by `config`
    ///
    /// Links are extracted with [`HtmlLinkExtractor`] and every visit is
    /// logged through [`LoggingObserver`] unless overridden.
    pub fn new(app: impl Application + 'static, config: Config) -> Self {
        Self::from_shared(Arc::new(app), config)
    }

    /// Creates a coordinator for an application that is already shared
    pub fn from_shared(app: Arc<dyn Application>, config: Config) -> Self {
        let logging: Arc<dyn VisitObserver> = Arc::new(LoggingObserver);
        Self {
            config,
            app,
            extractor: Arc::new(HtmlLinkExtractor::new()),
            observers: vec![logging],
            join_strategy: None,
            config_hash: None,
        }
    }

    pub fn with_extractor(mut self, extractor: impl LinkExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn VisitObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Overrides how the coordinator waits for spawned workers
    ///
    /// By default it polls the marker directory forever, or with a deadline
    /// when `join-timeout-secs` is configured.
    pub fn with_join_strategy(mut self, strategy: impl JoinStrategy + 'static) -> Self {
        self.join_strategy = Some(Box::new(strategy));
        self
    }

    /// Hash of the configuration file, recorded with the ledger run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Every reachable target was visited
    /// * `Err(FreezeError)` - Seeds could not be read, the ledger failed, or a
    ///   worker did not finish normally
    pub fn run(mut self) -> Result<CrawlReport> {
        let seeds = load_seeds(&self.config)?;
        let worklist = Worklist::seeded(&seeds);
        let workers = self.config.parallel.workers.max(1);
        let start_time = Instant::now();

        tracing::info!(
            "Freezing into {} with {} worker(s) from {} seed(s)",
            self.config.output.destination.display(),
            workers,
            worklist.len()
        );

        let context = self.context();
        let report = if workers == 1 {
            self.run_serial(context, worklist)?
        } else {
            let strategy = self
                .join_strategy
                .take()
                .unwrap_or_else(|| self.default_join_strategy());
            self.run_parallel(context, worklist, strategy)?
        };

        tracing::info!(
            "Crawl completed: {} visits, {} distinct paths, {} files written in {:?}",
            report.visits,
            report.distinct_paths,
            report.files.len(),
            start_time.elapsed()
        );

        Ok(report)
    }

    fn context(&self) -> Arc<CrawlContext> {
        Arc::new(CrawlContext {
            app: Arc::clone(&self.app),
            extractor: Arc::clone(&self.extractor),
            observers: self.observers.clone(),
            filter: HostFilter::new(self.config.crawl.allowed_hosts.clone()),
            follow_links: self.config.crawl.follow_links,
            output: self.config.output.clone(),
        })
    }

    fn default_join_strategy(&self) -> Box<dyn JoinStrategy> {
        let parallel = &self.config.parallel;
        match parallel.join_timeout() {
            Some(timeout) => Box::new(BoundedWait::new(parallel.poll_interval(), timeout)),
            None => Box::new(PollMarkers::new(parallel.poll_interval())),
        }
    }

    fn run_serial(&self, context: Arc<CrawlContext>, worklist: Worklist) -> Result<CrawlReport> {
        let mut scheduler = Scheduler::new(0, context, worklist, None);
        scheduler.run()?;

        let distinct = scheduler.seen().len() as u64;
        Ok(CrawlReport::from_summaries(
            vec![scheduler.into_summary()],
            distinct,
        ))
    }

    fn run_parallel(
        &self,
        context: Arc<CrawlContext>,
        worklist: Worklist,
        strategy: Box<dyn JoinStrategy>,
    ) -> Result<CrawlReport> {
        let ledger_path = self.config.ledger_path();
        let lock_timeout = self.config.parallel.lock_timeout();

        let markers = MarkerDir::open(self.config.marker_dir())?;
        let stale = markers.clear()?;
        if stale > 0 {
            tracing::warn!(
                "Removed {} stale worker marker(s) from {}",
                stale,
                markers.path().display()
            );
        }

        let config_hash = self
            .config_hash
            .clone()
            .unwrap_or_else(|| hash_content(&format!("{:?}", self.config)));
        let mut owner = SqliteLedger::create_run(&ledger_path, &config_hash, lock_timeout)?;
        let run_id = owner.run_id();
        tracing::info!("Started ledger run {} in {}", run_id, ledger_path.display());

        let spawner = Spawner {
            context: Arc::clone(&context),
            markers: markers.clone(),
            ledger_path: ledger_path.clone(),
            run_id,
            lock_timeout,
            max_children: self.config.parallel.workers.saturating_sub(1),
            handles: Vec::new(),
            spawning_failed: false,
        };

        match crawl_with_workers(context, worklist, spawner, strategy.as_ref()) {
            Ok(summaries) => {
                let distinct = owner.complete_run(RunStatus::Completed)?;
                let mut report = CrawlReport::from_summaries(summaries, distinct);
                report.run_id = Some(run_id);
                Ok(report)
            }
            Err(e) => {
                if let Err(close_err) = owner.complete_run(RunStatus::Failed) {
                    tracing::warn!("Failed to close ledger run {}: {}", run_id, close_err);
                }
                Err(e)
            }
        }
    }
}

/// Runs the first worker, splitting its worklist as it goes, then waits for
/// every worker it spawned
fn crawl_with_workers(
    context: Arc<CrawlContext>,
    worklist: Worklist,
    mut spawner: Spawner,
    strategy: &dyn JoinStrategy,
) -> Result<Vec<WorkerSummary>> {
    let ledger = SqliteLedger::attach(&spawner.ledger_path, spawner.run_id, 0, spawner.lock_timeout)?;
    let mut scheduler = Scheduler::new(0, context, worklist, Some(Box::new(ledger)));

    let parent_result = scheduler.run_with(|worklist| spawner.split(worklist));
    if let Err(e) = &parent_result {
        tracing::error!("Worker 0 stopped: {}", e);
    }

    let handles = spawner.handles;
    tracing::info!(
        "Worker 0 finished, waiting for {} spawned worker(s)",
        handles.len()
    );
    strategy.wait(&spawner.markers, &handles)?;
    parent_result?;

    let mut summaries = vec![scheduler.into_summary()];
    for handle in handles {
        summaries.push(handle.join()?);
    }
    Ok(summaries)
}

/// Hands halves of the first worker's worklist to new worker threads
struct Spawner {
    context: Arc<CrawlContext>,
    markers: MarkerDir,
    ledger_path: PathBuf,
    run_id: i64,
    lock_timeout: Duration,
    max_children: usize,
    handles: Vec<WorkerHandle>,
    spawning_failed: bool,
}

impl Spawner {
    /// Moves the back half of `worklist` to a new worker if the limits allow
    ///
    /// The worker's marker exists before its thread starts. If the thread
    /// cannot be spawned the marker is removed, the targets go back on the
    /// worklist and no further workers are attempted.
    fn split(&mut self, worklist: &mut Worklist) {
        if self.spawning_failed
            || worklist.len() < 2
            || self.handles.len() >= self.max_children
        {
            return;
        }

        let id = self.handles.len() + 1;
        let half = worklist.split_off_half();

        let marker = match self.markers.create(id) {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!("Failed to create marker for worker {}: {}", id, e);
                self.spawning_failed = true;
                worklist.append(half);
                return;
            }
        };

        let size = half.len();
        let returned = half.clone();
        match spawn_worker(
            id,
            Arc::clone(&self.context),
            half,
            self.ledger_path.clone(),
            self.run_id,
            self.lock_timeout,
            self.markers.clone(),
        ) {
            Ok(thread) => {
                tracing::info!("Spawned worker {} with {} target(s)", id, size);
                self.handles.push(WorkerHandle::new(id, marker, thread));
            }
            Err(e) => {
                tracing::warn!("Failed to spawn worker {}, continuing without it: {}", id, e);
                if let Err(e) = self.markers.remove(id) {
                    tracing::warn!("Failed to remove marker for worker {}: {}", id, e);
                }
                self.spawning_failed = true;
                worklist.append(returned);
            }
        }
    }
}

fn spawn_worker(
    id: usize,
    context: Arc<CrawlContext>,
    worklist: Worklist,
    ledger_path: PathBuf,
    run_id: i64,
    lock_timeout: Duration,
    markers: MarkerDir,
) -> io::Result<JoinHandle<LedgerResult<WorkerSummary>>> {
    thread::Builder::new()
        .name(format!("freeze-worker-{}", id))
        .spawn(move || -> LedgerResult<WorkerSummary> {
            let result = run_worker(id, context, worklist, &ledger_path, run_id, lock_timeout);
            match result {
                Ok(summary) => {
                    // Only a normal exit removes the marker
                    markers.remove(id)?;
                    tracing::debug!("Worker {} exited after {} visits", id, summary.visits);
                    Ok(summary)
                }
                Err(e) => {
                    tracing::error!("Worker {} stopped: {}", id, e);
                    Err(e)
                }
            }
        })
}

fn run_worker(
    id: usize,
    context: Arc<CrawlContext>,
    worklist: Worklist,
    ledger_path: &Path,
    run_id: i64,
    lock_timeout: Duration,
) -> LedgerResult<WorkerSummary> {
    let ledger = SqliteLedger::attach(ledger_path, run_id, id, lock_timeout)?;
    let mut scheduler = Scheduler::new(id, context, worklist, Some(Box::new(ledger)));
    scheduler.run()?;
    Ok(scheduler.into_summary())
}
