//! Worker liveness markers and join strategies
//!
//! Every spawned worker gets a marker file in a shared directory, created
//! before the worker starts and removed by the worker itself when it finishes
//! normally. The coordinator decides the crawl is over by watching that
//! directory; how long it is willing to watch is up to the [`JoinStrategy`].

use crate::ledger::LedgerResult;
use crate::output::WorkerSummary;
use crate::{FreezeError, Result};
use chrono::Utc;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const MARKER_PREFIX: &str = "worker-";
const MARKER_SUFFIX: &str = ".alive";

/// Directory of worker liveness markers
#[derive(Debug, Clone)]
pub struct MarkerDir {
    dir: PathBuf,
}

impl MarkerDir {
    /// Opens the marker directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn marker_path(&self, worker: usize) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", MARKER_PREFIX, worker, MARKER_SUFFIX))
    }

    /// Creates the marker for `worker`, recording when it was started
    pub fn create(&self, worker: usize) -> io::Result<PathBuf> {
        let path = self.marker_path(worker);
        fs::write(&path, Utc::now().to_rfc3339())?;
        Ok(path)
    }

    /// Removes the marker for `worker`; a missing marker is not an error
    pub fn remove(&self, worker: usize) -> io::Result<()> {
        match fs::remove_file(self.marker_path(worker)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub fn exists(&self, worker: usize) -> bool {
        self.marker_path(worker).exists()
    }

    /// Ids of every worker whose marker is still present, ascending
    pub fn live_workers(&self) -> io::Result<Vec<usize>> {
        let mut workers: Vec<usize> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|name| name.strip_prefix(MARKER_PREFIX))
                .and_then(|rest| rest.strip_suffix(MARKER_SUFFIX))
                .and_then(|id| id.parse().ok());
            if let Some(id) = id {
                workers.push(id);
            }
        }
        workers.sort_unstable();
        Ok(workers)
    }

    pub fn any_alive(&self) -> io::Result<bool> {
        Ok(!self.live_workers()?.is_empty())
    }

    /// Removes markers left behind by an earlier crawl, returning how many
    pub fn clear(&self) -> io::Result<usize> {
        let stale = self.live_workers()?;
        for worker in &stale {
            self.remove(*worker)?;
        }
        Ok(stale.len())
    }
}

/// A spawned worker thread and the marker that stands for it
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: usize,
    pub marker: PathBuf,
    thread: JoinHandle<LedgerResult<WorkerSummary>>,
}

impl WorkerHandle {
    pub fn new(id: usize, marker: PathBuf, thread: JoinHandle<LedgerResult<WorkerSummary>>) -> Self {
        Self { id, marker, thread }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the thread and returns what it did
    ///
    /// A ledger error or a panic in the worker becomes
    /// [`FreezeError::WorkerFailed`].
    pub fn join(self) -> Result<WorkerSummary> {
        let id = self.id;
        match self.thread.join() {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => Err(FreezeError::WorkerFailed {
                worker: id,
                message: e.to_string(),
            }),
            Err(_) => Err(FreezeError::WorkerFailed {
                worker: id,
                message: "worker thread panicked".to_string(),
            }),
        }
    }
}

/// Decides when every spawned worker has finished
///
/// Called by the coordinator after its own worklist is empty. Returning `Ok`
/// means the handles can be joined without blocking indefinitely.
pub trait JoinStrategy: Send {
    fn wait(&self, markers: &MarkerDir, handles: &[WorkerHandle]) -> Result<()>;
}

/// Polls the marker directory until it is empty, with no upper bound
///
/// A worker that dies without removing its marker keeps this waiting forever.
#[derive(Debug, Clone)]
pub struct PollMarkers {
    pub interval: Duration,
}

impl PollMarkers {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl JoinStrategy for PollMarkers {
    fn wait(&self, markers: &MarkerDir, _handles: &[WorkerHandle]) -> Result<()> {
        while markers.any_alive()? {
            thread::sleep(self.interval);
        }
        Ok(())
    }
}

/// Polls the marker directory with a deadline
///
/// Also fails fast when a worker's thread has ended but its marker is still
/// there, which means the worker stopped abnormally.
#[derive(Debug, Clone)]
pub struct BoundedWait {
    pub interval: Duration,
    pub timeout: Duration,
}

impl BoundedWait {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl JoinStrategy for BoundedWait {
    fn wait(&self, markers: &MarkerDir, handles: &[WorkerHandle]) -> Result<()> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let live = markers.live_workers()?;
            if live.is_empty() {
                return Ok(());
            }

            if let Some(stale) = handles
                .iter()
                .find(|handle| handle.is_finished() && live.contains(&handle.id))
            {
                return Err(FreezeError::WorkerFailed {
                    worker: stale.id,
                    message: "exited without removing its liveness marker".to_string(),
                });
            }

            if Instant::now() >= deadline {
                return Err(FreezeError::JoinTimeout {
                    remaining: live.len(),
                });
            }
            thread::sleep(self.interval);
        }
    }
}
