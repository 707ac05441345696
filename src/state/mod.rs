//! State module for classifying crawl progress
//!
//! - `VisitOutcome`: what a single visit produced (written, redirected, conflict, ...)

mod outcome;

pub use outcome::VisitOutcome;
