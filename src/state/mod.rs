//! State module for tracking crawl progress
//!
//! This module provides the in-memory state a crawl job works with.
//!
//! # Components
//!
//! - `JobPhase`: The job's phase state machine (starting, discovering, ..., done)
//! - `Counters`: Extraction counters reported with every progress snapshot
//! - `Frontier`: The discovery working set (`to_visit`, `visited`, `discovered`)

mod frontier;
mod job_phase;

// Re-export main types
pub use frontier::Frontier;
pub use job_phase::{Counters, JobPhase};
