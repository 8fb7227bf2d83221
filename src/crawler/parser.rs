//! HTML parser for link discovery and content extraction
//!
//! This module handles parsing fetched HTML to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - The page's main content region as markdown
//! - A short cleaned summary of that content

use crate::config::ExtractionConfig;
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Tags dropped entirely during markdown conversion
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "iframe", "noscript", "svg", "img", "form", "button",
];

static RE_TABLE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^.*\|.*\|.*$").unwrap());
static RE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]\([^)]+\)").unwrap());
static RE_HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").unwrap());
static RE_BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Extracts all followable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
///
/// Links are resolved against `base_url` and returned as absolute strings;
/// host containment is left to the normalizer.
///
/// # Example
///
/// ```
/// use sitesweep::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(extract_links(html, &base_url), vec!["https://example.com/page"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}

/// Converts fetched pages into cleaned summaries
///
/// Selectors are parsed once at construction, so a bad selector in the
/// configuration fails before any crawl starts.
#[derive(Debug)]
pub struct ContentExtractor {
    content: Option<Selector>,
    excluded: Vec<Selector>,
    body: Selector,
    max_sentences: usize,
}

impl ContentExtractor {
    pub fn new(config: &ExtractionConfig) -> ConfigResult<Self> {
        let content = if config.content_selectors.is_empty() {
            None
        } else {
            Some(parse_selector(&config.content_selectors.join(", "))?)
        };

        let excluded = config
            .excluded_selectors
            .iter()
            .map(|s| parse_selector(s))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            content,
            excluded,
            body: parse_selector("body")?,
            max_sentences: config.max_sentences,
        })
    }

    /// Converts the page's content region to markdown
    ///
    /// Excluded elements are removed first. The outermost elements matching the
    /// content selectors are converted; without a match the whole `<body>` is.
    pub fn extract_markdown(&self, html: &str) -> String {
        let mut document = Html::parse_document(html);

        for selector in &self.excluded {
            let ids: Vec<_> = document.select(selector).map(|el| el.id()).collect();
            for id in ids {
                if let Some(mut node) = document.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        let region = self.content_region(&document);
        html_to_markdown(&region)
    }

    /// Extracts and cleans a page summary; None when nothing usable remains
    pub fn summarize(&self, html: &str) -> Option<String> {
        let markdown = self.extract_markdown(html);
        let summary = clean_text(&markdown, self.max_sentences);
        if summary.is_empty() {
            None
        } else {
            Some(summary)
        }
    }

    fn content_region(&self, document: &Html) -> String {
        if let Some(content) = &self.content {
            let outermost: Vec<String> = document
                .select(content)
                .filter(|el| {
                    !el.ancestors()
                        .filter_map(ElementRef::wrap)
                        .any(|ancestor| content.matches(&ancestor))
                })
                .map(|el| el.html())
                .collect();

            if !outermost.is_empty() {
                return outermost.join("\n");
            }
        }

        document
            .select(&self.body)
            .next()
            .map(|body| body.inner_html())
            .unwrap_or_else(|| document.root_element().html())
    }
}

fn parse_selector(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", selector, e)))
}

fn html_to_markdown(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    match converter.convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::debug!("Markdown conversion failed, using plain text: {}", e);
            Html::parse_fragment(html)
                .root_element()
                .text()
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Reduces extracted markdown to a short plain-text summary
///
/// In order: drops table-like lines, replaces `[text](target)` with `text`,
/// strips heading markers, collapses runs of blank lines, then keeps the first
/// `max_sentences` sentences. A sentence ends at `.`, `!` or `?` followed by
/// whitespace.
///
/// # Example
///
/// ```
/// use sitesweep::crawler::clean_text;
///
/// let summary = clean_text("# Welcome\n\nSee [our team](/team). We build tools.", 5);
/// assert_eq!(summary, "Welcome\n\nSee our team. We build tools.");
/// ```
pub fn clean_text(markdown: &str, max_sentences: usize) -> String {
    let text = RE_TABLE_LINE.replace_all(markdown, "");
    let text = RE_LINK.replace_all(&text, "$1");
    let text = RE_HEADING_MARKER.replace_all(&text, "");
    let text = RE_BLANK_RUN.replace_all(text.trim(), "\n\n");

    first_sentences(&text, max_sentences)
}

/// Returns the prefix of `text` holding its first `max_sentences` sentences
///
/// The original separators are kept, so lines are never merged.
fn first_sentences(text: &str, max_sentences: usize) -> String {
    if max_sentences == 0 {
        return String::new();
    }

    let mut count = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        match chars.peek() {
            Some(&(end, next)) if next.is_whitespace() => {
                count += 1;
                if count == max_sentences {
                    return text[..end].to_string();
                }
            }
            _ => {}
        }
    }

    text.to_string()
}
