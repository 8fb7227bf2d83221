//! JSON-file content hash index
//!
//! The on-disk document is a nested map `{host: {url: {hash, timestamp}}}`.
//! Lookups are served from an in-memory copy. Every write takes an exclusive
//! lock on a sidecar `.lock` file, re-reads the document, merges its own
//! entries and replaces the file atomically, so separate processes sharing
//! one index do not drop each other's entries.

use crate::storage::atomic::write_json_atomic;
use crate::storage::traits::{ContentHashIndex, StorageError, StorageResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One indexed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEntry {
    pub hash: String,
    pub timestamp: String,
}

type HostMap = BTreeMap<String, BTreeMap<String, HashEntry>>;

/// Content hash index backed by a single JSON document
#[derive(Debug)]
pub struct JsonHashIndex {
    path: PathBuf,
    entries: Mutex<HostMap>,
}

impl JsonHashIndex {
    /// Loads the index from `path`
    ///
    /// A missing file is an empty index. A corrupt file is also treated as
    /// empty and gets replaced on the next update.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = read_document(&path)?.unwrap_or_default();

        tracing::debug!(
            "Loaded hash index {} ({} hosts)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of every entry recorded for `host`
    pub fn host_entries(&self, host: &str) -> StorageResult<BTreeMap<String, HashEntry>> {
        let entries = self.lock()?;
        Ok(entries.get(host).cloned().unwrap_or_default())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HostMap>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Database("hash index lock poisoned".to_string()))
    }

    /// Takes the cross-process write lock; released when the file is dropped
    fn lock_file(&self) -> StorageResult<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(&self.path))?;
        file.lock()?;
        Ok(file)
    }
}

impl ContentHashIndex for JsonHashIndex {
    fn lookup(&self, host: &str, url: &str) -> StorageResult<Option<String>> {
        let entries = self.lock()?;
        Ok(entries
            .get(host)
            .and_then(|pages| pages.get(url))
            .map(|entry| entry.hash.clone()))
    }

    fn update(
        &self,
        host: &str,
        url: &str,
        hash: &str,
        timestamp: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.update_many(host, &[(url.to_string(), hash.to_string())], timestamp)
    }

    fn update_many(
        &self,
        host: &str,
        entries: &[(String, String)],
        timestamp: DateTime<Utc>,
    ) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut cached = self.lock()?;
        let _file_lock = self.lock_file()?;

        // Another process may have written since we last looked
        let mut merged = match read_document(&self.path)? {
            Some(on_disk) => on_disk,
            None => cached.clone(),
        };

        let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        let pages = merged.entry(host.to_string()).or_default();
        for (url, hash) in entries {
            pages.insert(
                url.clone(),
                HashEntry {
                    hash: hash.clone(),
                    timestamp: stamp.clone(),
                },
            );
        }

        write_json_atomic(&self.path, &merged)?;
        *cached = merged;
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let entries = self.lock()?;
        Ok(entries.values().map(BTreeMap::len).sum())
    }
}

/// Reads the document at `path`
///
/// Missing → empty map. Corrupt → `None`, with a warning.
fn read_document(path: &Path) -> StorageResult<Option<HostMap>> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<HostMap>(&content) {
            Ok(map) => Ok(Some(map)),
            Err(e) => {
                tracing::warn!(
                    "Hash index {} is corrupt, starting empty: {}",
                    path.display(),
                    e
                );
                Ok(None)
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Some(HostMap::new())),
        Err(e) => Err(e.into()),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.lock", name))
}
