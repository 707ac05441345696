//! Statistics generation from a ledger file
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics recorded in the seen ledger.

use crate::ledger::{LedgerResult, RunRecord, SeenLedger, SqliteLedger};

/// Ledger statistics summary
#[derive(Debug, Clone)]
pub struct LedgerStatistics {
    /// Every run recorded in the ledger, oldest first
    pub runs: Vec<RunRecord>,

    /// Run the remaining figures describe
    pub run_id: i64,

    /// Distinct paths claimed in that run
    pub distinct_paths: u64,

    /// Paths claimed per worker in that run
    pub paths_by_worker: Vec<(usize, u64)>,
}

/// Loads statistics for the ledger's latest run
///
/// # Arguments
///
/// * `ledger` - A ledger handle attached to the run of interest
///
/// # Returns
///
/// * `Ok(LedgerStatistics)` - Successfully loaded statistics
/// * `Err(LedgerError)` - Failed to query the ledger
pub fn load_statistics(ledger: &SqliteLedger) -> LedgerResult<LedgerStatistics> {
    Ok(LedgerStatistics {
        runs: ledger.runs()?,
        run_id: ledger.run_id(),
        distinct_paths: ledger.count()?,
        paths_by_worker: ledger.count_by_worker()?,
    })
}

/// Prints ledger statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Ledger Statistics ===\n");

    println!("Runs ({}):", stats.runs.len());
    for run in &stats.runs {
        let distinct = run
            .distinct_paths
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} {} started {} finished {} paths {} config {}",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-"),
            distinct,
            short_hash(&run.config_hash)
        );
    }
    println!();

    println!("Run {}:", stats.run_id);
    println!("  Distinct paths claimed: {}", stats.distinct_paths);
    println!();

    if !stats.paths_by_worker.is_empty() {
        println!("Paths by Worker:");
        for (worker, count) in &stats.paths_by_worker {
            let percentage = if stats.distinct_paths > 0 {
                (*count as f64 / stats.distinct_paths as f64) * 100.0
            } else {
                0.0
            };
            println!("  worker {}: {} ({:.1}%)", worker, count, percentage);
        }
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
