//! Extraction phase
//!
//! Fetches every discovered URL in sequential batches, reduces each page to
//! a cleaned summary, skips pages whose content hash is unchanged since the
//! last run, and writes one artifact per host once all batches settle.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::ContentExtractor;
use crate::crawler::scheduler::{FetchOutcome, Scheduler};
use crate::output::{ArtifactWriter, ErrorLog, ExtractedPage};
use crate::state::Counters;
use crate::storage::ContentHashIndex;
use crate::url::CanonicalUrl;
use crate::Result;
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Lowercase hex SHA-256 of a summary
pub fn content_hash(summary: &str) -> String {
    hex::encode(Sha256::digest(summary.as_bytes()))
}

/// What happened to one URL
#[derive(Debug)]
enum PageOutcome {
    Extracted(ExtractedPage),
    Unchanged,
    Failed(String),
}

/// Result of a completed extraction phase
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub counters: Counters,

    /// Artifacts written, one per host with at least one new page
    pub artifacts: Vec<PathBuf>,
}

/// Extraction engine for one job
pub struct ExtractionEngine<'a> {
    fetcher: &'a dyn PageFetcher,
    scheduler: &'a Scheduler,
    extractor: &'a ContentExtractor,
    hash_index: Arc<dyn ContentHashIndex>,
    artifacts: &'a ArtifactWriter,
    error_log: &'a ErrorLog,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        scheduler: &'a Scheduler,
        extractor: &'a ContentExtractor,
        hash_index: Arc<dyn ContentHashIndex>,
        artifacts: &'a ArtifactWriter,
        error_log: &'a ErrorLog,
    ) -> Self {
        Self {
            fetcher,
            scheduler,
            extractor,
            hash_index,
            artifacts,
            error_log,
        }
    }

    /// Extracts `urls` and writes the per-host artifacts for `run_date`
    ///
    /// `on_progress` sees the counters after every settled URL. Per-URL
    /// failures are counted and logged; only a fatal fetch error or a failed
    /// artifact write fails the call.
    pub async fn extract<P>(
        &self,
        urls: &[CanonicalUrl],
        batch_size: usize,
        run_date: NaiveDate,
        mut on_progress: P,
    ) -> Result<ExtractionReport>
    where
        P: FnMut(&Counters) + Send,
    {
        let mut counters = Counters::with_total(urls.len() as u64);
        let mut by_host: BTreeMap<String, Vec<ExtractedPage>> = BTreeMap::new();

        tracing::info!("Extracting {} URLs (batch size {})", urls.len(), batch_size);

        for batch in urls.chunks(batch_size.max(1)) {
            let results = self.scheduler.run_batch(self.fetcher, batch).await;

            for (url, outcome) in results {
                match self.process(&url, outcome)? {
                    PageOutcome::Extracted(page) => {
                        tracing::debug!("Extracted {}", url);
                        by_host.entry(url.host()).or_default().push(page);
                        counters.record_success();
                    }
                    PageOutcome::Unchanged => {
                        tracing::debug!("Unchanged {}", url);
                        counters.record_skip();
                    }
                    PageOutcome::Failed(message) => {
                        self.error_log.record(url.as_str(), &message);
                        counters.record_failure();
                    }
                }
                on_progress(&counters);
            }
        }

        let artifacts = self.persist(run_date, by_host).await?;

        tracing::info!(
            "Extraction finished: {} extracted, {} unchanged, {} failed",
            counters.success,
            counters.skipped,
            counters.failed
        );

        Ok(ExtractionReport {
            counters,
            artifacts,
        })
    }

    /// Classifies one fetch result; only fatal fetch errors escape
    fn process(&self, url: &CanonicalUrl, outcome: FetchOutcome) -> Result<PageOutcome> {
        let page = match outcome {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => return Ok(PageOutcome::Failed(e.to_string())),
        };

        let Some(summary) = self.extractor.summarize(&page.html) else {
            return Ok(PageOutcome::Failed("no extractable content".to_string()));
        };

        let hash = content_hash(&summary);
        let host = url.host();

        match self.hash_index.lookup(&host, url.as_str()) {
            Ok(Some(previous)) if previous == hash => return Ok(PageOutcome::Unchanged),
            Ok(_) => {}
            Err(e) => tracing::warn!("Hash lookup failed for {}: {}", url, e),
        }

        Ok(PageOutcome::Extracted(ExtractedPage::new(url, summary, hash)))
    }

    /// Writes each host's artifact, then records its hashes
    ///
    /// Hashes are recorded only after the artifact holding the pages exists,
    /// so an interrupted run never marks unsaved content as seen. Each host
    /// costs one artifact write and one index write, off the async workers.
    async fn persist(
        &self,
        run_date: NaiveDate,
        by_host: BTreeMap<String, Vec<ExtractedPage>>,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(by_host.len());

        for (host, pages) in by_host {
            let artifacts = self.artifacts.clone();
            let index = Arc::clone(&self.hash_index);
            let path = tokio::task::spawn_blocking(move || {
                persist_host(&artifacts, index.as_ref(), run_date, &host, &pages)
            })
            .await??;
            written.push(path);
        }

        Ok(written)
    }
}

fn persist_host(
    artifacts: &ArtifactWriter,
    index: &dyn ContentHashIndex,
    run_date: NaiveDate,
    host: &str,
    pages: &[ExtractedPage],
) -> Result<PathBuf> {
    let path = artifacts.write(run_date, host, pages)?;

    let entries: Vec<(String, String)> = pages
        .iter()
        .map(|page| (page.url.clone(), page.hash.clone()))
        .collect();
    if let Err(e) = index.update_many(host, &entries, Utc::now()) {
        tracing::warn!("Hash update failed for {} ({} pages): {}", host, entries.len(), e);
    }

    Ok(path)
}
