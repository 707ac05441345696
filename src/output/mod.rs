//! Output module for crawl events and summaries
//!
//! This module handles:
//! - Observing visits as workers make them
//! - Summarizing what each worker and the whole crawl did
//! - Printing statistics recorded in a ledger file

mod observers;
pub mod stats;
mod traits;

pub use observers::{LoggingObserver, StatsObserver};
pub use stats::{load_statistics, print_statistics, LedgerStatistics};
pub use traits::{CrawlReport, VisitObserver, WorkerSummary};
