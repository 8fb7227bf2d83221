//! Job statistics from the progress store
//!
//! This module aggregates every job's latest progress record into the
//! dashboard figures and prints them.

use crate::state::JobPhase;
use crate::storage::{ProgressSnapshot, ProgressStore, StorageResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated statistics over all known jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobStatistics {
    /// Number of progress records
    pub total_jobs: u64,

    /// Jobs in a non-terminal phase
    pub active: u64,

    /// Jobs that reached `done`
    pub completed: u64,

    pub stopped: u64,

    pub errored: u64,

    /// Summed per-job counters
    pub pages_succeeded: u64,
    pub pages_failed: u64,
    pub pages_skipped: u64,

    /// Job count per status string
    pub jobs_by_status: BTreeMap<String, u64>,
}

impl JobStatistics {
    /// `success / (success + failed)` as a percentage; 0 without data
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_succeeded + self.pages_failed;
        if attempted == 0 {
            0.0
        } else {
            (self.pages_succeeded as f64 / attempted as f64) * 100.0
        }
    }
}

/// Aggregates a set of progress records
pub fn compute_statistics<'a, I>(snapshots: I) -> JobStatistics
where
    I: IntoIterator<Item = &'a ProgressSnapshot>,
{
    let mut stats = JobStatistics::default();

    for snapshot in snapshots {
        stats.total_jobs += 1;
        match snapshot.status {
            JobPhase::Done => stats.completed += 1,
            JobPhase::Stopped => stats.stopped += 1,
            JobPhase::Error => stats.errored += 1,
            _ => stats.active += 1,
        }

        stats.pages_succeeded += snapshot.counters.success;
        stats.pages_failed += snapshot.counters.failed;
        stats.pages_skipped += snapshot.counters.skipped;

        *stats
            .jobs_by_status
            .entry(snapshot.status.as_status().to_string())
            .or_insert(0) += 1;
    }

    stats
}

/// Loads statistics from a progress store
pub fn load_statistics(store: &dyn ProgressStore) -> StorageResult<JobStatistics> {
    let records = store.list()?;
    Ok(compute_statistics(records.iter().map(|(_, snapshot)| snapshot)))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &JobStatistics) {
    println!("=== Job Statistics ===\n");

    println!("Overview:");
    println!("  Total jobs: {}", stats.total_jobs);
    println!("  Active: {}", stats.active);
    println!("  Completed: {}", stats.completed);
    println!("  Stopped: {}", stats.stopped);
    println!("  Errored: {}", stats.errored);
    println!();

    if !stats.jobs_by_status.is_empty() {
        println!("Jobs by Status:");
        let mut status_counts: Vec<_> = stats.jobs_by_status.iter().collect();
        status_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (status, count) in status_counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    println!("Pages:");
    println!("  Extracted: {}", stats.pages_succeeded);
    println!("  Failed: {}", stats.pages_failed);
    println!("  Unchanged (skipped): {}", stats.pages_skipped);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully extracted)",
        stats.success_rate(),
        stats.pages_succeeded,
        stats.pages_succeeded + stats.pages_failed
    );
}
