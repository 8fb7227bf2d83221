use crate::config::CrawlerConfig;

/// Extension-based exclusion filter for discovered links
///
/// Matching is a case-insensitive suffix test on the URL path, so query
/// strings never influence it.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// Builds a filter from bare extensions (`"pdf"`, `"docx"`, ...)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: extensions
                .into_iter()
                .map(|ext| format!(".{}", ext.as_ref().trim_start_matches('.').to_lowercase()))
                .collect(),
        }
    }

    /// Builds the filter configured for the crawler
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(&config.excluded_extensions)
    }

    /// Returns true if `path` ends in one of the excluded extensions
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        self.suffixes.iter().any(|suffix| path.ends_with(suffix))
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
