//! Configuration module for Site-Freezer
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and reading seed lists.
//!
//! # Example
//!
//! ```no_run
//! use site_freezer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("freeze.toml")).unwrap();
//! println!("Crawling with {} worker(s)", config.parallel.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, OutputConfig, ParallelConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_content, load_config, load_config_with_hash, load_seeds,
    parse_config, read_seeds,
};
pub use validation::{validate, MAX_WORKERS};
