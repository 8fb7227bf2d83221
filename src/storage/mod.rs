//! Storage module for persisting crawl state
//!
//! This module handles everything a crawl writes to disk besides its output
//! artifacts:
//! - Per-job progress records
//! - The content hash index (JSON document or SQLite database)
//! - Atomic whole-file replacement shared by every JSON writer

mod atomic;
mod hash_index;
mod progress;
mod schema;
mod sqlite;
mod traits;

pub use atomic::{write_atomic, write_json_atomic};
pub use hash_index::{HashEntry, JsonHashIndex};
pub use progress::{FileProgressStore, ProgressSnapshot};
pub use sqlite::SqliteHashIndex;
pub use traits::{ContentHashIndex, ProgressStore, StorageError, StorageResult};

use crate::config::{HashIndexBackend, OutputConfig};
use std::path::Path;
use std::sync::Arc;

/// Opens the configured content hash index
pub fn open_hash_index(config: &OutputConfig) -> StorageResult<Arc<dyn ContentHashIndex>> {
    let index: Arc<dyn ContentHashIndex> = match config.hash_index_backend {
        HashIndexBackend::Json => Arc::new(JsonHashIndex::open(&config.hash_index_path)?),
        HashIndexBackend::Sqlite => {
            Arc::new(SqliteHashIndex::new(Path::new(&config.hash_index_path))?)
        }
    };
    Ok(index)
}

/// Opens the progress store under the configured progress directory
pub fn open_progress_store(config: &OutputConfig) -> StorageResult<Arc<dyn ProgressStore>> {
    Ok(Arc::new(FileProgressStore::new(&config.progress_dir)?))
}
