use crate::url::domain::host_key;
use crate::url::filter::ExtensionFilter;
use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A normalized URL used as the deduplication key
///
/// The canonical form is `scheme://host[:port]/path`: query string, fragment
/// and credentials are stripped, dot segments are resolved and the host is
/// lowercased. Two links to the same page compare equal once canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    /// Returns the canonical string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host key (`host` or `host:port`) of this URL
    pub fn host(&self) -> String {
        host_key(&self.0).unwrap_or_default()
    }

    /// Derives a page title: the last non-empty path segment, or the host
    pub fn title(&self) -> String {
        self.0
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.host())
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Resolves `raw_url` against `base_url` and reduces it to its canonical form
///
/// Only `http` and `https` results are accepted. No domain or extension
/// filtering happens here; see [`Normalizer`] for the full rule set.
///
/// # Examples
///
/// ```
/// use sitesweep::url::canonicalize;
/// use url::Url;
///
/// let base = Url::parse("https://site.test/dir/page").unwrap();
/// let url = canonicalize("../other?x=1#top", &base).unwrap();
/// assert_eq!(url.as_str(), "https://site.test/other");
/// ```
pub fn canonicalize(raw_url: &str, base_url: &Url) -> UrlResult<CanonicalUrl> {
    let raw_url = raw_url.trim();
    let mut url = base_url
        .join(raw_url)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);
    // Both setters only fail for URLs that cannot carry credentials
    let _ = url.set_username("");
    let _ = url.set_password(None);

    Ok(CanonicalUrl(url))
}

/// Canonicalizes a seed URL given on its own (no base to resolve against)
pub fn canonicalize_seed(seed: &str) -> UrlResult<CanonicalUrl> {
    let parsed = Url::parse(seed.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", seed, e)))?;
    canonicalize(parsed.as_str(), &parsed)
}

/// Link normalizer bound to one job's target host
///
/// Rejects links that resolve to another host (cross-domain links are never
/// followed) and links whose path ends in an excluded extension.
#[derive(Debug, Clone)]
pub struct Normalizer {
    target_host: String,
    filter: ExtensionFilter,
}

impl Normalizer {
    /// Creates a normalizer for the host of `seed`
    pub fn for_seed(seed: &CanonicalUrl, filter: ExtensionFilter) -> Self {
        Self {
            target_host: seed.host(),
            filter,
        }
    }

    /// Creates a normalizer for an explicit host key
    pub fn new(target_host: impl Into<String>, filter: ExtensionFilter) -> Self {
        Self {
            target_host: target_host.into().to_lowercase(),
            filter,
        }
    }

    /// Returns the host key every accepted URL must have
    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    /// Normalizes a discovered link
    ///
    /// Returns `None` when the link is unparseable, not HTTP(S), on another
    /// host, or excluded by extension.
    pub fn normalize(&self, raw_url: &str, base_url: &Url) -> Option<CanonicalUrl> {
        let canonical = match canonicalize(raw_url, base_url) {
            Ok(c) => c,
            Err(e) => {
                tracing::trace!("Rejected link {}: {}", raw_url, e);
                return None;
            }
        };

        let url = canonical.as_url();

        if host_key(url).as_deref() != Some(self.target_host.as_str()) {
            return None;
        }

        if self.filter.is_excluded(url.path()) {
            return None;
        }

        Some(canonical)
    }
}
