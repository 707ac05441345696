//! Site-Freezer ledger inspector
//!
//! Crawls run inside the embedding program, since the application being frozen
//! lives there. This binary inspects the ledger a parallel crawl left behind.

use anyhow::Context;
use clap::Parser;
use site_freezer::ledger::SqliteLedger;
use site_freezer::logging::setup_logging;
use site_freezer::output::{load_statistics, print_statistics};
use std::path::PathBuf;

/// Site-Freezer: inspect the seen ledger of a parallel crawl
///
/// Prints every run recorded in the ledger and, for the latest run, how many
/// distinct paths were claimed and by which worker.
#[derive(Parser, Debug)]
#[command(name = "site-freezer")]
#[command(version = "1.0.0")]
#[command(about = "Inspect a site-freezer seen ledger", long_about = None)]
struct Cli {
    /// Path to the ledger file
    #[arg(value_name = "LEDGER")]
    ledger: PathBuf,

    /// List claimed paths of the latest run in claim order
    #[arg(long)]
    list: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::debug!("Opening ledger {}", cli.ledger.display());
    let ledger = SqliteLedger::open_for_inspection(&cli.ledger)
        .with_context(|| format!("Failed to open ledger {}", cli.ledger.display()))?;

    let stats = load_statistics(&ledger).context("Failed to read ledger statistics")?;
    if stats.runs.is_empty() {
        println!("No crawl runs recorded in {}", cli.ledger.display());
        return Ok(());
    }
    print_statistics(&stats);

    if cli.list {
        println!();
        println!("Claimed Paths:");
        for entry in ledger.entries().context("Failed to read ledger entries")? {
            println!("  {}  worker {}  {}", entry.claimed_at, entry.worker, entry.path);
        }
    }

    Ok(())
}
