use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Freezer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub output: OutputConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl Config {
    /// Configuration with defaults for everything but the destination
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            output: OutputConfig {
                destination: destination.into(),
                index_name: default_index_name(),
            },
            crawl: CrawlConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }

    /// Directory holding crawl bookkeeping, next to (not inside) the destination
    ///
    /// A destination such as `.` is resolved through the filesystem first so
    /// the state directory is named after the real directory. The filesystem
    /// root has no such name and is refused by validation.
    pub fn state_dir(&self) -> PathBuf {
        let destination = self
            .output
            .named_destination()
            .unwrap_or_else(|| self.output.destination.clone());
        match destination.file_name() {
            Some(name) => {
                let mut name = name.to_os_string();
                name.push(".freeze-state");
                destination.with_file_name(name)
            }
            None => destination.join(".freeze-state"),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.parallel
            .ledger_path
            .clone()
            .unwrap_or_else(|| self.state_dir().join("ledger.sqlite"))
    }

    pub fn marker_dir(&self) -> PathBuf {
        self.parallel
            .marker_dir
            .clone()
            .unwrap_or_else(|| self.state_dir().join("workers"))
    }
}

/// Where and how responses are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the static tree
    pub destination: PathBuf,

    /// File name used for URL paths ending in `/`
    #[serde(rename = "index-name", default = "default_index_name")]
    pub index_name: String,
}

impl OutputConfig {
    /// The destination as a path ending in a directory name
    ///
    /// Paths ending in `.` or `..` are canonicalized, which requires them to
    /// exist. Returns `None` for the filesystem root.
    pub fn named_destination(&self) -> Option<PathBuf> {
        if self.destination.file_name().is_some() {
            return Some(self.destination.clone());
        }
        fs::canonicalize(&self.destination)
            .ok()
            .filter(|path| path.file_name().is_some())
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Queue links discovered in 200 responses
    #[serde(rename = "follow-links", default = "default_true")]
    pub follow_links: bool,

    /// Host patterns (`*` wildcard) absolute links must match to be crawled
    #[serde(rename = "allowed-hosts", default)]
    pub allowed_hosts: Vec<String>,

    /// Literal seed URLs or paths
    #[serde(default)]
    pub seeds: Vec<String>,

    /// File with one seed per line, read in addition to `seeds`
    #[serde(rename = "seed-file", default)]
    pub seed_file: Option<PathBuf>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            follow_links: true,
            allowed_hosts: Vec::new(),
            seeds: Vec::new(),
            seed_file: None,
        }
    }
}

/// Parallel worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ParallelConfig {
    /// Total number of workers, including the one that starts the crawl
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Shared seen ledger file
    #[serde(rename = "ledger-path", default)]
    pub ledger_path: Option<PathBuf>,

    /// Directory for worker liveness markers
    #[serde(rename = "marker-dir", default)]
    pub marker_dir: Option<PathBuf>,

    /// How often the coordinator checks for remaining markers (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a worker waits for the ledger lock before giving up (milliseconds)
    #[serde(rename = "lock-timeout-ms", default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Upper bound on waiting for workers; unset waits forever
    #[serde(rename = "join-timeout-secs", default)]
    pub join_timeout_secs: Option<u64>,
}

impl ParallelConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            ledger_path: None,
            marker_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            join_timeout_secs: None,
        }
    }
}

fn default_index_name() -> String {
    "index.html".to_string()
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_lock_timeout_ms() -> u64 {
    30_000
}
