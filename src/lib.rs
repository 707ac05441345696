//! Site-Freezer: turn an in-process application into a static site
//!
//! This crate crawls every link an [`Application`](app::Application) exposes and
//! writes each response to a file tree that can be served without running the
//! application, optionally splitting the crawl across parallel workers that
//! share one locked dedup ledger.

pub mod app;
pub mod config;
pub mod crawler;
pub mod ledger;
pub mod logging;
pub mod materializer;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Freezer operations
#[derive(Debug, Error)]
pub enum FreezeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    #[error("Timed out waiting for {remaining} worker(s) to finish")]
    JoinTimeout { remaining: usize },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Empty crawl target")]
    Empty,
}

/// Result type alias for Site-Freezer operations
pub type Result<T> = std::result::Result<T, FreezeError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use app::{Application, Body, ChunkSource, Request, Response};
pub use config::Config;
pub use crawler::{freeze, Coordinator, CrawlReport, HtmlLinkExtractor, LinkExtractor};
pub use materializer::{map_path, Materializer, Visit};
pub use state::VisitOutcome;
pub use url::CrawlTarget;
