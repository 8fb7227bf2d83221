//! Append-only log of per-URL failures
//!
//! Lines look like `[2025-05-01T10:00:00Z] ERROR @ https://site.test/a: HTTP status 404`.
//! The file is a diagnostic side channel; nothing reads it back.

use chrono::{SecondsFormat, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct ErrorLog {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            lock: Mutex::new(()),
        }
    }

    /// A log that only emits tracing events
    pub fn disabled() -> Self {
        Self {
            path: None,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records a failure for `url`
    ///
    /// Failing to append is itself only logged; a broken log file never
    /// affects the crawl.
    pub fn record(&self, url: &str, message: &str) {
        tracing::warn!("{}: {}", url, message);

        let Some(path) = &self.path else {
            return;
        };

        let line = format_line(url, message);
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = append_line(path, &line) {
            tracing::warn!("Could not write error log {}: {}", path.display(), e);
        }
    }
}

fn format_line(url: &str, message: &str) -> String {
    format!(
        "[{}] ERROR @ {}: {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        url,
        message.replace('\n', " ")
    )
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}
