//! Output module for extraction results and crawl reports
//!
//! This module handles:
//! - Writing per-host JSON artifacts into date-partitioned run directories
//! - Listing past runs and their artifacts
//! - The append-only per-URL error log
//! - Aggregated job statistics

mod artifacts;
mod error_log;
pub mod stats;

pub use artifacts::{parse_run_date, ArtifactWriter, ExtractedPage};
pub use error_log::ErrorLog;
pub use stats::{compute_statistics, load_statistics, print_statistics, JobStatistics};
