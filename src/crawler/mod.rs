//! Crawler module for fetching and processing a site
//!
//! This module contains the core crawling logic, including:
//! - The fetch port and its HTTP implementation
//! - HTML parsing, link extraction and content summaries
//! - Batch scheduling under a global concurrency cap
//! - The discovery and extraction engines and their coordination

mod coordinator;
mod discovery;
mod extraction;
mod fetcher;
mod parser;
mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_crawl, Coordinator, CrawlContext};
pub use discovery::DiscoveryEngine;
pub use extraction::{content_hash, ExtractionEngine, ExtractionReport};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher, MAX_REDIRECTS};
pub use parser::{clean_text, extract_links, ContentExtractor};
pub use scheduler::{FetchOutcome, Scheduler};
