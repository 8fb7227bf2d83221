//! Storage traits and error types
//!
//! This module defines the trait interfaces for the two persistent stores a
//! crawl writes to, and their shared error type.

use crate::storage::ProgressSnapshot;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable store of per-job progress snapshots
///
/// Writes replace the whole record. A record is written by exactly one job
/// engine and may be read by any process.
pub trait ProgressStore: Send + Sync {
    /// Replaces the snapshot for `job_id`
    fn write(&self, job_id: &str, snapshot: &ProgressSnapshot) -> StorageResult<()>;

    /// Reads the latest snapshot
    ///
    /// Missing and unreadable records both yield `Ok(None)`.
    fn read(&self, job_id: &str) -> StorageResult<Option<ProgressSnapshot>>;

    /// Lists every readable record as `(job_id, snapshot)`
    fn list(&self) -> StorageResult<Vec<(String, ProgressSnapshot)>>;

    /// Removes a record; returns false if it did not exist
    fn delete(&self, job_id: &str) -> StorageResult<bool>;
}

/// Persistent last-write-wins index of content hashes keyed by (host, URL)
///
/// Implementations serialize concurrent updates internally.
pub trait ContentHashIndex: Send + Sync {
    /// Returns the stored hash for a page, if any
    fn lookup(&self, host: &str, url: &str) -> StorageResult<Option<String>>;

    /// Records `hash` as the current content hash of a page
    fn update(
        &self,
        host: &str,
        url: &str,
        hash: &str,
        timestamp: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Records several pages of one host in a single write
    ///
    /// `entries` holds `(url, hash)` pairs.
    fn update_many(
        &self,
        host: &str,
        entries: &[(String, String)],
        timestamp: DateTime<Utc>,
    ) -> StorageResult<()> {
        for (url, hash) in entries {
            self.update(host, url, hash, timestamp)?;
        }
        Ok(())
    }

    /// Counts indexed pages across all hosts
    fn len(&self) -> StorageResult<usize>;

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
