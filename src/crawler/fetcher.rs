//! HTTP fetcher implementation
//!
//! This module defines the fetch port the engines depend on and its default
//! reqwest-backed implementation:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with bounded redirects
//! - Error classification (transient vs. fatal)

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::url::CanonicalUrl;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Maximum redirect hops followed per fetch
pub const MAX_REDIRECTS: usize = 10;

/// Why a fetch produced no page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("not an HTML page (content type {0:?})")]
    ContentMismatch(String),

    /// The fetch backend itself cannot operate; aborts the job
    #[error("fetch backend failure: {0}")]
    Fatal(String),
}

impl FetchError {
    /// Returns true for errors that must abort the whole job
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Fatal(_))
    }
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the content was served from, after redirects
    pub final_url: String,
    pub html: String,
}

/// Fetch port used by both crawl phases
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sitesweep::config::{CrawlerConfig, UserAgentConfig};
/// use sitesweep::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.fetch_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.fetch_timeout_secs.min(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, crawler)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Missing content type is accepted; servers omit it for plain pages
        if !content_type.is_empty() && !is_html_content_type(&content_type) {
            return Err(FetchError::ContentMismatch(content_type));
        }

        let html = response.text().await.map_err(classify_error)?;

        Ok(FetchedPage { final_url, html })
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Maps a reqwest error onto the transient/fatal taxonomy
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_builder() {
        FetchError::Fatal(e.to_string())
    } else if e.is_redirect() {
        FetchError::Network(format!("redirect error: {}", e))
    } else if e.is_connect() {
        FetchError::Network(format!("connection failed: {}", e))
    } else {
        FetchError::Network(e.to_string())
    }
}
