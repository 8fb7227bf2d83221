//! Per-host extraction artifacts
//!
//! Layout: `<output-dir>/<YYYY-MM-DD>/<host>.json`, one JSON array of
//! [`ExtractedPage`] per host per run date.

use crate::storage::{write_json_atomic, StorageError, StorageResult};
use crate::url::{host_file_stem, CanonicalUrl};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One extracted page as persisted in an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: String,

    #[serde(rename = "titel")]
    pub title: String,

    #[serde(rename = "samenvatting")]
    pub summary: String,

    /// Lowercase hex SHA-256 of `summary`
    pub hash: String,
}

impl ExtractedPage {
    /// Builds a page record; the title is derived from the URL path
    pub fn new(url: &CanonicalUrl, summary: String, hash: String) -> Self {
        Self {
            url: url.as_str().to_string(),
            title: url.title(),
            summary,
            hash,
        }
    }
}

/// Writes and lists artifacts under the output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn run_dir(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(date.format(DATE_FORMAT).to_string())
    }

    pub fn artifact_path(&self, date: NaiveDate, host: &str) -> PathBuf {
        self.run_dir(date)
            .join(format!("{}.json", host_file_stem(host)))
    }

    /// Replaces the artifact for `host` on `date`
    pub fn write(
        &self,
        date: NaiveDate,
        host: &str,
        pages: &[ExtractedPage],
    ) -> StorageResult<PathBuf> {
        let path = self.artifact_path(date, host);
        write_json_atomic(&path, &pages)?;
        tracing::info!("Wrote {} pages to {}", pages.len(), path.display());
        Ok(path)
    }

    pub fn read(&self, date: NaiveDate, host: &str) -> StorageResult<Vec<ExtractedPage>> {
        let path = self.artifact_path(date, host);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reads an artifact by the name `list_run_entries` returns; the
    /// `.json` suffix is optional
    pub fn read_entry(&self, date: NaiveDate, name: &str) -> StorageResult<Vec<ExtractedPage>> {
        self.read(date, name.strip_suffix(".json").unwrap_or(name))
    }

    /// Lists run dates that have an output directory, newest first
    pub fn list_runs(&self) -> StorageResult<Vec<NaiveDate>> {
        let entries = match fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            // Skips non-date directories such as logs/
            if let Some(date) = entry
                .file_name()
                .to_str()
                .and_then(|name| NaiveDate::parse_from_str(name, DATE_FORMAT).ok())
            {
                dates.push(date);
            }
        }

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Lists artifact file names of one run, sorted
    pub fn list_run_entries(&self, date: NaiveDate) -> StorageResult<Vec<String>> {
        let dir = self.run_dir(date);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!(
                    "no output for {}",
                    date.format(DATE_FORMAT)
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Parses a `YYYY-MM-DD` run date
pub fn parse_run_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::canonicalize_seed;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        parse_run_date(s).unwrap()
    }

    fn page(url: &str) -> ExtractedPage {
        ExtractedPage::new(&canonicalize_seed(url).unwrap(), "Summary.".into(), "abc".into())
    }

    #[test]
    fn test_page_wire_format() {
        let value = serde_json::to_value(page("https://site.test/about/team/")).unwrap();

        assert_eq!(value["url"], "https://site.test/about/team/");
        assert_eq!(value["titel"], "team");
        assert_eq!(value["samenvatting"], "Summary.");
        assert_eq!(value["hash"], "abc");
    }

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let pages = vec![page("https://site.test/a"), page("https://site.test/b")];

        let path = writer.write(date("2025-05-01"), "site.test", &pages).unwrap();

        assert!(path.ends_with("2025-05-01/site.test.json"));
        assert_eq!(writer.read(date("2025-05-01"), "site.test").unwrap(), pages);
    }

    #[test]
    fn test_port_is_sanitized_in_file_name() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let path = writer.artifact_path(date("2025-05-01"), "127.0.0.1:8080");
        assert_eq!(path.file_name().unwrap(), "127.0.0.1_8080.json");
    }

    #[test]
    fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let d = date("2025-05-01");

        writer.write(d, "site.test", &[page("https://site.test/a")]).unwrap();
        writer.write(d, "site.test", &[page("https://site.test/b")]).unwrap();

        let pages = writer.read(d, "site.test").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://site.test/b");
    }

    #[test]
    fn test_list_runs_newest_first() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        writer.write(date("2025-04-30"), "a.test", &[]).unwrap();
        writer.write(date("2025-05-02"), "a.test", &[]).unwrap();
        fs::create_dir_all(dir.path().join("logs")).unwrap();

        assert_eq!(
            writer.list_runs().unwrap(),
            vec![date("2025-05-02"), date("2025-04-30")]
        );
    }

    #[test]
    fn test_list_runs_without_output_dir() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("missing"));
        assert!(writer.list_runs().unwrap().is_empty());
    }

    #[test]
    fn test_list_run_entries() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let d = date("2025-05-01");
        writer.write(d, "b.test", &[]).unwrap();
        writer.write(d, "a.test", &[]).unwrap();

        assert_eq!(
            writer.list_run_entries(d).unwrap(),
            vec!["a.test.json".to_string(), "b.test.json".to_string()]
        );
    }

    #[test]
    fn test_read_entry_by_listed_name() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let d = date("2025-05-01");
        let pages = vec![page("http://127.0.0.1:8080/a")];
        writer.write(d, "127.0.0.1:8080", &pages).unwrap();

        let name = &writer.list_run_entries(d).unwrap()[0];
        assert_eq!(name, "127.0.0.1_8080.json");
        assert_eq!(writer.read_entry(d, name).unwrap(), pages);
        assert_eq!(writer.read_entry(d, "127.0.0.1_8080").unwrap(), pages);
        assert!(matches!(
            writer.read_entry(d, "other.test.json"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_run_entries_missing_date() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        assert!(matches!(
            writer.list_run_entries(date("2001-01-01")),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_run_date() {
        assert!(parse_run_date("2025-05-01").is_some());
        assert!(parse_run_date("logs").is_none());
        assert!(parse_run_date("2025-13-01").is_none());
    }
}
