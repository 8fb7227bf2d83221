//! Crawl coordinator - runs one job's phases in order
//!
//! This module wires the shared crawl resources into the two engines:
//! - Discovery from the seed (progress 0-80)
//! - Extraction of the discovered set (progress 80-100)
//!
//! Terminal records (`done`, `error`, `stopped`) are written by the job
//! runner's supervised task, not here.

use crate::config::Config;
use crate::crawler::discovery::DiscoveryEngine;
use crate::crawler::extraction::{ExtractionEngine, ExtractionReport};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::parser::ContentExtractor;
use crate::crawler::scheduler::Scheduler;
use crate::jobs::ProgressReporter;
use crate::output::{ArtifactWriter, ErrorLog};
use crate::storage::{open_hash_index, ContentHashIndex};
use crate::url::{CanonicalUrl, ExtensionFilter};
use crate::Result;
use chrono::Local;
use std::sync::Arc;

/// Resources shared by every job of a runner
///
/// Cloning is cheap; clones share the fetcher, the global fetch semaphore,
/// the hash index and the error log.
#[derive(Clone)]
pub struct CrawlContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub scheduler: Scheduler,
    pub extractor: Arc<ContentExtractor>,
    pub hash_index: Arc<dyn ContentHashIndex>,
    pub artifacts: ArtifactWriter,
    pub error_log: Arc<ErrorLog>,
    pub filter: ExtensionFilter,
    pub batch_size: usize,
    pub extract_seed: bool,
}

impl CrawlContext {
    /// Builds the context with the default HTTP fetcher
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Builds the context around a caller-supplied fetcher
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            fetcher,
            scheduler: Scheduler::new(&config.crawler),
            extractor: Arc::new(ContentExtractor::new(&config.extraction)?),
            hash_index: open_hash_index(&config.output)?,
            artifacts: ArtifactWriter::new(&config.output.output_dir),
            error_log: Arc::new(ErrorLog::new(&config.output.error_log_path)),
            filter: ExtensionFilter::from_config(&config.crawler),
            batch_size: config.crawler.batch_size,
            extract_seed: config.crawler.extract_seed,
        })
    }
}

/// Runs one crawl job
pub struct Coordinator {
    context: CrawlContext,
    seed: CanonicalUrl,
}

impl Coordinator {
    pub fn new(context: CrawlContext, seed: CanonicalUrl) -> Self {
        Self { context, seed }
    }

    pub fn seed(&self) -> &CanonicalUrl {
        &self.seed
    }

    /// Runs discovery then extraction, reporting through `reporter`
    ///
    /// Returns the extraction report; the caller records the outcome.
    pub async fn run(&self, reporter: &mut ProgressReporter) -> Result<ExtractionReport> {
        let ctx = &self.context;
        let run_date = Local::now().date_naive();

        reporter.begin_discovery()?;
        let discovered = DiscoveryEngine::new(
            ctx.fetcher.as_ref(),
            &ctx.scheduler,
            &ctx.filter,
            &ctx.error_log,
        )
        .discover(&self.seed, ctx.batch_size, |estimate| {
            reporter.discovery_progress(estimate)
        })
        .await?;

        let mut urls: Vec<CanonicalUrl> = Vec::with_capacity(discovered.len() + 1);
        if ctx.extract_seed {
            urls.push(self.seed.clone());
        }
        urls.extend(discovered);

        reporter.discovery_done(urls.len() as u64)?;
        reporter.begin_extraction()?;

        ExtractionEngine::new(
            ctx.fetcher.as_ref(),
            &ctx.scheduler,
            &ctx.extractor,
            Arc::clone(&ctx.hash_index),
            &ctx.artifacts,
            &ctx.error_log,
        )
        .extract(&urls, ctx.batch_size, run_date, |counters| {
            reporter.extraction_progress(counters)
        })
        .await
    }
}

/// Runs a single crawl to completion in the current task
///
/// Convenience wrapper for callers that do not need a [`crate::jobs::JobRunner`].
/// The terminal record is written before returning.
pub async fn run_crawl(
    context: CrawlContext,
    seed: CanonicalUrl,
    mut reporter: ProgressReporter,
) -> Result<ExtractionReport> {
    let coordinator = Coordinator::new(context, seed);
    match coordinator.run(&mut reporter).await {
        Ok(report) => {
            reporter.complete(report.counters)?;
            Ok(report)
        }
        Err(e) => {
            reporter.fail(e.to_string())?;
            Err(e)
        }
    }
}
