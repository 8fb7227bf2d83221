//! Sitesweep: a domain-bounded site harvester
//!
//! This crate discovers every reachable page of a single website and extracts a
//! short textual summary of each one. A crawl runs in two phases:
//!
//! 1. **Discovery** - breadth-first, batch-parallel traversal restricted to the
//!    seed's host (progress 0-80%)
//! 2. **Extraction** - batch-parallel fetch, clean, hash-deduplicate and persist
//!    (progress 80-100%)
//!
//! Results are written as one JSON artifact per host per run date, and every job
//! keeps a durable progress record that other processes can read.

pub mod config;
pub mod crawler;
pub mod jobs;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sitesweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error(transparent)]
    Fetch(#[from] crawler::FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::JobPhase,
        to: state::JobPhase,
    },

    #[error("Invalid job id: {0:?}")]
    InvalidJobId(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already running: {0}")]
    JobAlreadyRunning(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sitesweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use jobs::{JobId, JobRunner};
pub use state::{Counters, JobPhase};
pub use url::{normalize, CanonicalUrl};
