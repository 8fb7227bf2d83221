//! Discovery phase
//!
//! Breadth-first, batch-parallel traversal of one host starting at a seed.
//! Every fetched page is scanned for links; accepted links join the frontier
//! exactly once. Failed fetches are logged and skipped, never retried.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::extract_links;
use crate::crawler::scheduler::Scheduler;
use crate::output::ErrorLog;
use crate::state::Frontier;
use crate::url::{CanonicalUrl, ExtensionFilter, Normalizer};
use crate::Result;
use std::collections::BTreeSet;
use url::Url;

/// Discovery engine for one job
pub struct DiscoveryEngine<'a> {
    fetcher: &'a dyn PageFetcher,
    scheduler: &'a Scheduler,
    filter: &'a ExtensionFilter,
    error_log: &'a ErrorLog,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        scheduler: &'a Scheduler,
        filter: &'a ExtensionFilter,
        error_log: &'a ErrorLog,
    ) -> Self {
        Self {
            fetcher,
            scheduler,
            filter,
            error_log,
        }
    }

    /// Finds every in-domain URL reachable from `seed`
    ///
    /// `on_progress` receives the raw 0-80 estimate after each batch. The seed
    /// is fetched but is not part of the result. A seed that cannot be fetched
    /// yields an empty set. Only a fatal fetch error fails the call.
    pub async fn discover<P>(
        &self,
        seed: &CanonicalUrl,
        batch_size: usize,
        mut on_progress: P,
    ) -> Result<BTreeSet<CanonicalUrl>>
    where
        P: FnMut(u8) + Send,
    {
        let normalizer = Normalizer::for_seed(seed, self.filter.clone());
        let mut frontier = Frontier::new(seed.clone());
        let mut batches = 0usize;

        tracing::info!(
            "Discovering {} (host {}, batch size {})",
            seed,
            normalizer.target_host(),
            batch_size
        );

        while !frontier.is_exhausted() {
            let batch = frontier.next_batch(batch_size);
            let results = self.scheduler.run_batch(self.fetcher, &batch).await;
            batches += 1;

            for (url, outcome) in results {
                match outcome {
                    Ok(page) => {
                        let added = self.scan_page(&normalizer, &mut frontier, &url, &page.html, &page.final_url);
                        tracing::debug!("Scanned {} ({} new links)", url, added);
                    }
                    Err(e) if e.is_fatal() => {
                        tracing::error!("Discovery aborted at {}: {}", url, e);
                        return Err(e.into());
                    }
                    Err(e) => self.error_log.record(url.as_str(), &e.to_string()),
                }
            }

            on_progress(frontier.progress_estimate());
        }

        tracing::info!(
            "Discovery of {} finished: {} URLs in {} batches",
            seed,
            frontier.discovered().len(),
            batches
        );

        Ok(frontier.into_discovered())
    }

    /// Offers every accepted link of a page to the frontier; returns how many were new
    fn scan_page(
        &self,
        normalizer: &Normalizer,
        frontier: &mut Frontier,
        url: &CanonicalUrl,
        html: &str,
        final_url: &str,
    ) -> usize {
        // Relative links resolve against where the page was actually served from
        let base = Url::parse(final_url).unwrap_or_else(|_| url.as_url().clone());

        extract_links(html, &base)
            .iter()
            .filter_map(|link| normalizer.normalize(link, &base))
            .filter(|candidate| frontier.offer(candidate.clone()))
            .count()
    }
}
