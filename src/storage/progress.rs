//! File-backed progress records
//!
//! Each job owns `<progress-dir>/<job_id>.json`. Records are replaced whole on
//! every write, so a reader in another process always sees a complete snapshot.

use crate::state::{Counters, JobPhase};
use crate::storage::atomic::write_json_atomic;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Point-in-time view of one job's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Overall progress percentage, 0-100
    pub progress: u8,

    /// Current phase, serialized as the status string
    pub status: JobPhase,

    #[serde(flatten)]
    pub counters: Counters,

    /// Seed URL of the job
    pub url: String,

    /// When the snapshot was written
    pub timestamp: DateTime<Utc>,

    /// Failure message, present only on `error` records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressSnapshot {
    /// Creates a snapshot stamped with the current time
    pub fn new(status: JobPhase, progress: u8, counters: Counters, url: impl Into<String>) -> Self {
        Self {
            progress: progress.min(100),
            status,
            counters,
            url: url.into(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// The initial record every job starts with
    pub fn starting(url: impl Into<String>) -> Self {
        Self::new(JobPhase::Starting, 0, Counters::default(), url)
    }
}

/// Progress store keeping one JSON file per job
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    /// Opens (and creates if needed) the progress directory
    pub fn new(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, job_id: &str) -> StorageResult<PathBuf> {
        validate_job_key(job_id)?;
        Ok(self.dir.join(format!("{}.json", job_id)))
    }

    fn read_path(path: &Path) -> Option<ProgressSnapshot> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Unreadable progress record {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Corrupt progress record {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl ProgressStore for FileProgressStore {
    fn write(&self, job_id: &str, snapshot: &ProgressSnapshot) -> StorageResult<()> {
        let path = self.record_path(job_id)?;
        write_json_atomic(&path, snapshot)
    }

    fn read(&self, job_id: &str) -> StorageResult<Option<ProgressSnapshot>> {
        let path = self.record_path(job_id)?;
        Ok(Self::read_path(&path))
    }

    fn list(&self) -> StorageResult<Vec<(String, ProgressSnapshot)>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(job_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if job_id.starts_with('.') {
                continue;
            }
            if let Some(snapshot) = Self::read_path(&path) {
                records.push((job_id.to_string(), snapshot));
            }
        }

        records.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        Ok(records)
    }

    fn delete(&self, job_id: &str) -> StorageResult<bool> {
        let path = self.record_path(job_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Job ids double as file names, so only a safe character set is accepted
fn validate_job_key(job_id: &str) -> StorageResult<()> {
    let valid = !job_id.is_empty()
        && job_id.len() <= 128
        && !job_id.starts_with('.')
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(job_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileProgressStore) {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::new(dir.path().join("progress")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, store) = store();
        let snapshot = ProgressSnapshot::starting("https://site.test/");

        store.write("job-1", &snapshot).unwrap();
        let read = store.read("job-1").unwrap().unwrap();

        assert_eq!(read, snapshot);
        assert_eq!(read.status, JobPhase::Starting);
    }

    #[test]
    fn test_overwrite_semantics() {
        let (_dir, store) = store();
        store
            .write("job-1", &ProgressSnapshot::starting("https://site.test/"))
            .unwrap();

        let mut counters = Counters::with_total(10);
        counters.record_success();
        let update = ProgressSnapshot::new(JobPhase::Extracting, 82, counters, "https://site.test/");
        store.write("job-1", &update).unwrap();

        let read = store.read("job-1").unwrap().unwrap();
        assert_eq!(read.status, JobPhase::Extracting);
        assert_eq!(read.counters.done, 1);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_wire_format() {
        let snapshot = ProgressSnapshot::new(
            JobPhase::Extracting,
            90,
            Counters {
                done: 5,
                total: 10,
                success: 3,
                failed: 1,
                skipped: 1,
            },
            "https://site.test/",
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["progress"], 90);
        assert_eq!(value["status"], "scraping");
        assert_eq!(value["done"], 5);
        assert_eq!(value["total"], 10);
        assert_eq!(value["success"], 3);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["url"], "https://site.test/");
        assert!(value["timestamp"].is_string());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_reads_record_without_skipped_field() {
        let (_dir, store) = store();
        let legacy = r#"{
            "progress": 100, "status": "done", "done": 2, "total": 2,
            "success": 2, "failed": 0, "url": "https://site.test/",
            "timestamp": "2025-05-01T10:00:00Z"
        }"#;
        fs::write(store.dir().join("legacy.json"), legacy).unwrap();

        let read = store.read("legacy").unwrap().unwrap();
        assert_eq!(read.status, JobPhase::Done);
        assert_eq!(read.counters.skipped, 0);
    }

    #[test]
    fn test_missing_record_is_none() {
        let (_dir, store) = store();
        assert!(store.read("nope").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_none() {
        let (_dir, store) = store();
        fs::write(store.dir().join("broken.json"), "{ not json").unwrap();

        assert!(store.read("broken").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store();
        store
            .write("job-1", &ProgressSnapshot::starting("https://site.test/"))
            .unwrap();

        assert!(store.delete("job-1").unwrap());
        assert!(!store.delete("job-1").unwrap());
        assert!(store.read("job-1").unwrap().is_none());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let (_dir, store) = store();
        let snapshot = ProgressSnapshot::starting("https://site.test/");

        for id in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(
                store.write(id, &snapshot),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_error_message_roundtrip() {
        let (_dir, store) = store();
        let mut snapshot = ProgressSnapshot::new(JobPhase::Error, 100, Counters::default(), "u");
        snapshot.error = Some("backend unavailable".to_string());
        store.write("job-e", &snapshot).unwrap();

        let read = store.read("job-e").unwrap().unwrap();
        assert_eq!(read.error.as_deref(), Some("backend unavailable"));
    }
}
