//! Batch scheduler
//!
//! This module handles:
//! - Running one batch of fetches concurrently and awaiting all of them
//! - Global concurrency limiting via a semaphore shared by every job
//! - Per-fetch timeouts

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::url::CanonicalUrl;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Outcome of one fetch task within a batch
pub type FetchOutcome = Result<FetchedPage, FetchError>;

/// Runs fetch batches under a global concurrency cap
///
/// The scheduler coordinates:
/// - Global concurrency limits (max fetches in flight across all jobs)
/// - Per-fetch timeouts
/// - Batch barriers: a batch settles completely before the caller sees it
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    fetch_timeout: Duration,
}

impl Scheduler {
    /// Creates a scheduler with its own semaphore
    pub fn new(config: &CrawlerConfig) -> Self {
        Self::with_semaphore(
            Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    /// Creates a scheduler sharing an existing semaphore
    pub fn with_semaphore(global_semaphore: Arc<Semaphore>, fetch_timeout: Duration) -> Self {
        Self {
            global_semaphore,
            fetch_timeout,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Number of fetch slots currently free
    pub fn available_permits(&self) -> usize {
        self.global_semaphore.available_permits()
    }

    /// Fetches every URL of a batch concurrently
    ///
    /// Returns one outcome per input URL, in input order, once all fetches
    /// have settled. A failing fetch never affects its siblings.
    pub async fn run_batch<F>(
        &self,
        fetcher: &F,
        urls: &[CanonicalUrl],
    ) -> Vec<(CanonicalUrl, FetchOutcome)>
    where
        F: PageFetcher + ?Sized,
    {
        let tasks = urls.iter().map(|url| async move {
            let outcome = self.fetch_one(fetcher, url).await;
            (url.clone(), outcome)
        });

        join_all(tasks).await
    }

    async fn fetch_one<F>(&self, fetcher: &F, url: &CanonicalUrl) -> FetchOutcome
    where
        F: PageFetcher + ?Sized,
    {
        let _permit = self
            .global_semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Fatal("fetch pool closed".to_string()))?;

        match tokio::time::timeout(self.fetch_timeout, fetcher.fetch(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    /// Closes the fetch pool; queued and future fetches fail as fatal
    pub fn close(&self) {
        self.global_semaphore.close();
    }
}
