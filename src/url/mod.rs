//! URL handling module for Site-Freezer
//!
//! This module provides crawl targets, link resolution and the host allow-list
//! filter applied to every target before it is visited.

mod matcher;
mod target;

pub use matcher::matches_pattern;
pub use target::{resolve_link, CrawlTarget};

/// Allow-list of hosts the crawler may visit
///
/// Targets without an explicit host always pass; they address the application
/// itself. Targets with a host pass only if some pattern matches it. Parsed
/// hosts are always lowercase, so patterns are lowercased on construction.
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    patterns: Vec<String>,
}

impl HostFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(|pattern| pattern.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns true if the target may be crawled
    ///
    /// # Examples
    ///
    /// ```
    /// use site_freezer::url::{CrawlTarget, HostFilter};
    ///
    /// let filter = HostFilter::new(vec!["*.example.com".to_string()]);
    ///
    /// assert!(filter.allows(&CrawlTarget::parse("/local").unwrap()));
    /// assert!(filter.allows(&CrawlTarget::parse("https://www.example.com/").unwrap()));
    /// assert!(!filter.allows(&CrawlTarget::parse("https://other.org/").unwrap()));
    /// ```
    pub fn allows(&self, target: &CrawlTarget) -> bool {
        match &target.host {
            None => true,
            Some(host) => self
                .patterns
                .iter()
                .any(|pattern| matches_pattern(pattern, host)),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
