//! Job management
//!
//! This module runs crawls as supervised background tasks:
//! - Job ids and the live job-handle map
//! - Cancellation and panic containment per job
//! - Single-writer progress reporting

mod reporter;
mod runner;

pub use reporter::{ProgressReporter, DISCOVERY_SHARE};
pub use runner::{JobId, JobRunner};
