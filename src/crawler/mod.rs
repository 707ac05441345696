//! Crawler module for walking an application and freezing it to disk
//!
//! This module contains the core crawling logic, including:
//! - Worklist scheduling with host filtering, dedup and redirects
//! - Link extraction from materialized pages
//! - Parallel workers with liveness markers and join strategies
//! - Overall crawl coordination

mod coordinator;
mod join;
mod parser;
mod scheduler;

pub use coordinator::Coordinator;
pub use join::{BoundedWait, JoinStrategy, MarkerDir, PollMarkers, WorkerHandle};
pub use parser::{extract_links, HtmlLinkExtractor, LinkExtractor};
pub use scheduler::{CrawlContext, Scheduler, Worklist};

pub use crate::output::CrawlReport;

use crate::app::Application;
use crate::config::Config;
use crate::Result;

/// Freezes `app` into the configured destination
///
/// This is the main entry point for a crawl. It will:
/// 1. Seed the worklist from the configured seeds (or `/`)
/// 2. Visit every reachable target allowed by the host filter
/// 3. Write each 200 response to its mapped file
/// 4. Split the work across parallel workers when more than one is configured
///
/// # Arguments
///
/// * `app` - The application to crawl
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(FreezeError)` - Crawl failed
///
/// # Example
///
/// ```no_run
/// use site_freezer::{freeze, Config, Request, Response};
///
/// let app = |request: &Request| -> anyhow::Result<Response> {
///     Ok(Response::ok(format!("<h1>{}</h1>", request.path))
///         .with_header("Content-Type", "text/html"))
/// };
///
/// let report = freeze(app, Config::new("./build")).unwrap();
/// println!("{} files written", report.files.len());
/// ```
pub fn freeze(app: impl Application + 'static, config: Config) -> Result<CrawlReport> {
    Coordinator::new(app, config).run()
}
