//! In-memory fetcher for engine tests

use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::url::CanonicalUrl;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned responses keyed by canonical URL; unknown URLs are 404s
#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, Result<String, FetchError>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(html.to_string()));
        self
    }

    pub fn failure(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.as_str().to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(url.as_str()) {
            Some(Ok(html)) => Ok(FetchedPage {
                final_url: url.as_str().to_string(),
                html: html.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::HttpStatus(404)),
        }
    }
}
