use serde::Deserialize;

/// Main configuration structure for Sitesweep
///
/// Every section is optional; missing sections and keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of URLs fetched concurrently per batch, in both phases
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Upper bound on fetches in flight across all running jobs
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-fetch timeout (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Path extensions that are never followed (case-insensitive, no dot)
    #[serde(rename = "excluded-extensions")]
    pub excluded_extensions: Vec<String>,

    /// Also extract the seed page itself
    #[serde(rename = "extract-seed")]
    pub extract_seed: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: 15,
            max_concurrent_fetches: 15,
            fetch_timeout_secs: 30,
            excluded_extensions: ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "rar"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extract_seed: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Sitesweep".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sitesweep".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Content extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Regions that hold the page's main content, tried as one selector group
    #[serde(rename = "content-selectors")]
    pub content_selectors: Vec<String>,

    /// Elements removed before conversion (consent banners and the like)
    #[serde(rename = "excluded-selectors")]
    pub excluded_selectors: Vec<String>,

    /// Sentences kept in each summary
    #[serde(rename = "max-sentences")]
    pub max_sentences: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            content_selectors: vec![
                "main".to_string(),
                "article".to_string(),
                "section".to_string(),
            ],
            excluded_selectors: vec![
                ".cookie".to_string(),
                ".consent".to_string(),
                ".banner".to_string(),
            ],
            max_sentences: 5,
        }
    }
}

/// Which store backs the content hash index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashIndexBackend {
    #[default]
    Json,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the date-partitioned artifact tree
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Directory holding one progress record per job
    #[serde(rename = "progress-dir")]
    pub progress_dir: String,

    /// Path to the content hash index (JSON document or SQLite database)
    #[serde(rename = "hash-index-path")]
    pub hash_index_path: String,

    #[serde(rename = "hash-index-backend")]
    pub hash_index_backend: HashIndexBackend,

    /// Append-only per-URL failure log
    #[serde(rename = "error-log-path")]
    pub error_log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            progress_dir: "progress".to_string(),
            hash_index_path: "hashes.json".to_string(),
            hash_index_backend: HashIndexBackend::Json,
            error_log_path: "output/logs/errors.log".to_string(),
        }
    }
}
