//! URL handling module for Sitesweep
//!
//! This module turns raw hyperlink targets into canonical URLs and decides
//! which of them a crawl may follow:
//! - Resolution against the page they were found on
//! - Canonicalization (query, fragment and credentials stripped)
//! - Host containment against the job's target host
//! - Extension-based exclusion (documents and archives)

mod domain;
mod filter;
mod normalize;

pub use domain::{host_file_stem, host_key};
pub use filter::ExtensionFilter;
pub use normalize::{canonicalize, canonicalize_seed, CanonicalUrl, Normalizer};

use ::url::Url;

/// Normalizes `raw_url` found on `base_url` for a crawl of `target_host`
///
/// Convenience wrapper over [`Normalizer`] using the default extension filter.
/// Returns `None` if the link must not be followed.
///
/// # Examples
///
/// ```
/// use sitesweep::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("https://site.test/").unwrap();
/// assert_eq!(
///     normalize("/a?x=1", &base, "site.test").unwrap().as_str(),
///     "https://site.test/a"
/// );
/// assert!(normalize("https://external.test/c", &base, "site.test").is_none());
/// assert!(normalize("/doc.pdf", &base, "site.test").is_none());
/// ```
pub fn normalize(raw_url: &str, base_url: &Url, target_host: &str) -> Option<CanonicalUrl> {
    Normalizer::new(target_host, ExtensionFilter::default()).normalize(raw_url, base_url)
}
