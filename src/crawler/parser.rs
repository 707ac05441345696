//! Link extraction from materialized pages
//!
//! This module handles finding the references a visited page makes:
//! - The `LinkExtractor` seam the scheduler calls after every 200 visit
//! - An HTML implementation that reads the file the materializer wrote
//!
//! Extractors return raw reference strings; resolving them against the page
//! and filtering by scheme happens in the scheduler.

use crate::materializer::Visit;
use scraper::{Html, Selector};
use std::fs;

/// Finds the outgoing links of a visited page
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, visit: &Visit) -> Vec<String>;
}

impl<F> LinkExtractor for F
where
    F: Fn(&Visit) -> Vec<String> + Send + Sync,
{
    fn extract(&self, visit: &Visit) -> Vec<String> {
        self(visit)
    }
}

/// Elements and attributes that reference other resources of the site
const LINK_SELECTORS: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("link[href]", "href"),
    ("img[src]", "src"),
    ("script[src]", "src"),
];

/// Extracts links from HTML pages written to disk
///
/// A visit is treated as HTML when its `Content-Type` is `text/html` or
/// `application/xhtml+xml`, or, without a content type, when the written
/// file ends in `.html`/`.htm`. Everything else yields no links.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, visit: &Visit) -> Vec<String> {
        let file = match &visit.file {
            Some(file) => file,
            None => return Vec::new(),
        };

        let is_html = match visit.content_type() {
            Some(content_type) => is_html_content_type(content_type),
            None => file
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
                .unwrap_or(false),
        };
        if !is_html {
            return Vec::new();
        }

        match fs::read(file) {
            Ok(bytes) => extract_links(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                tracing::warn!(
                    "Failed to read {} for link extraction: {}",
                    file.display(),
                    e
                );
                Vec::new()
            }
        }
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Extracts every followable reference from an HTML document, in document
/// order per selector
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href>`, `<link href>`, `<img src>`, `<script src>`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
///
/// # Example
///
/// ```
/// use site_freezer::crawler::extract_links;
///
/// let html = r#"<a href="/about">About</a><a href="mailto:me@example.com">Mail</a>"#;
/// assert_eq!(extract_links(html), vec!["/about"]);
/// ```
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for (selector, attribute) in LINK_SELECTORS {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(_) => continue,
        };

        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attribute) {
                if is_followable(value) {
                    links.push(value.trim().to_string());
                }
            }
        }
    }

    links
}

fn is_followable(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    !(lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:"))
}
