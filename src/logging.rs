//! Logging setup
//!
//! Library code only emits `tracing` events; embedders and the binary call
//! [`setup_logging`] once to print them.

use tracing_subscriber::EnvFilter;

/// Maps verbosity flags to a filter directive
pub fn filter_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        // Only show errors
        return "error";
    }
    match verbose {
        0 => "site_freezer=info,warn",
        1 => "site_freezer=debug,info",
        2 => "site_freezer=trace,debug",
        _ => "trace",
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags. Calling this more
/// than once is harmless; only the first subscriber is installed.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .try_init();
}
