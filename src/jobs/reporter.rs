//! Single-writer progress reporting for one job
//!
//! A [`ProgressReporter`] is created when a job is submitted and moved into
//! the job's task; nothing else writes that job's record. It enforces the
//! phase state machine and keeps the reported figures from going backwards.

use crate::state::{Counters, JobPhase};
use crate::storage::{ProgressSnapshot, ProgressStore};
use crate::{Result, SweepError};
use std::sync::Arc;

/// Upper bound of the discovery share of overall progress
pub const DISCOVERY_SHARE: u8 = 80;

pub struct ProgressReporter {
    job_id: String,
    store: Arc<dyn ProgressStore>,
    current: ProgressSnapshot,
}

impl ProgressReporter {
    /// Creates the job's record in the `starting` phase
    pub fn start(store: Arc<dyn ProgressStore>, job_id: &str, url: &str) -> Result<Self> {
        let reporter = Self {
            job_id: job_id.to_string(),
            store,
            current: ProgressSnapshot::starting(url),
        };
        reporter.persist()?;
        Ok(reporter)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn phase(&self) -> JobPhase {
        self.current.status
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.current
    }

    pub fn begin_discovery(&mut self) -> Result<()> {
        self.transition(JobPhase::Discovering, 0, Counters::default())
    }

    /// Records a raw discovery estimate
    ///
    /// The reported value is clamped to the discovery share and never
    /// decreases, even when the frontier grows faster than it drains.
    pub fn discovery_progress(&mut self, estimate: u8) {
        if self.current.status != JobPhase::Discovering {
            return;
        }

        let progress = estimate.min(DISCOVERY_SHARE).max(self.current.progress);
        if progress == self.current.progress {
            return;
        }

        self.current.progress = progress;
        self.touch_best_effort();
    }

    /// Marks discovery complete with `total` URLs queued for extraction
    pub fn discovery_done(&mut self, total: u64) -> Result<()> {
        self.transition(
            JobPhase::DiscoveryDone,
            DISCOVERY_SHARE,
            Counters::with_total(total),
        )
    }

    pub fn begin_extraction(&mut self) -> Result<()> {
        let counters = Counters::with_total(self.current.counters.total);
        self.transition(JobPhase::Extracting, DISCOVERY_SHARE, counters)
    }

    /// Records extraction counters after a settled URL
    ///
    /// Updates that would move `done` backwards are ignored.
    pub fn extraction_progress(&mut self, counters: &Counters) {
        if self.current.status != JobPhase::Extracting || counters.done < self.current.counters.done {
            return;
        }

        self.current.progress = counters.extraction_progress().max(self.current.progress);
        self.current.counters = *counters;
        self.touch_best_effort();
    }

    /// Final `done` record
    pub fn complete(&mut self, counters: Counters) -> Result<()> {
        self.transition(JobPhase::Done, 100, counters)
    }

    /// Final `error` record; counters and progress keep their last values
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.check(JobPhase::Error)?;
        self.current.status = JobPhase::Error;
        self.current.error = Some(message.into());
        self.touch()
    }

    /// Final `stopped` record; counters and progress keep their last values
    pub fn stop(&mut self) -> Result<()> {
        self.check(JobPhase::Stopped)?;
        self.current.status = JobPhase::Stopped;
        self.touch()
    }

    fn check(&self, next: JobPhase) -> Result<()> {
        if self.current.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(SweepError::InvalidTransition {
                from: self.current.status,
                to: next,
            })
        }
    }

    fn transition(&mut self, next: JobPhase, progress: u8, counters: Counters) -> Result<()> {
        self.check(next)?;
        tracing::debug!("Job {}: {} -> {}", self.job_id, self.current.status, next);

        self.current.status = next;
        self.current.progress = progress.max(self.current.progress);
        self.current.counters = counters;
        self.touch()
    }

    fn touch(&mut self) -> Result<()> {
        self.current.timestamp = chrono::Utc::now();
        self.persist()
    }

    /// Intermediate updates never fail the job; the next write catches up
    fn touch_best_effort(&mut self) {
        if let Err(e) = self.touch() {
            tracing::warn!("Job {}: progress write failed: {}", self.job_id, e);
        }
    }

    fn persist(&self) -> Result<()> {
        self.store.write(&self.job_id, &self.current)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileProgressStore;
    use tempfile::TempDir;

    fn reporter() -> (TempDir, Arc<dyn ProgressStore>, ProgressReporter) {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn ProgressStore> = Arc::new(FileProgressStore::new(dir.path()).unwrap());
        let reporter = ProgressReporter::start(Arc::clone(&store), "job-1", "https://site.test/").unwrap();
        (dir, store, reporter)
    }

    fn stored(store: &Arc<dyn ProgressStore>) -> ProgressSnapshot {
        store.read("job-1").unwrap().unwrap()
    }

    #[test]
    fn test_start_writes_starting_record() {
        let (_dir, store, _reporter) = reporter();
        let record = stored(&store);

        assert_eq!(record.status, JobPhase::Starting);
        assert_eq!(record.progress, 0);
        assert_eq!(record.url, "https://site.test/");
    }

    #[test]
    fn test_full_lifecycle() {
        let (_dir, store, mut reporter) = reporter();

        reporter.begin_discovery().unwrap();
        reporter.discovery_progress(40);
        assert_eq!(stored(&store).progress, 40);

        reporter.discovery_done(4).unwrap();
        let record = stored(&store);
        assert_eq!(record.status, JobPhase::DiscoveryDone);
        assert_eq!(record.progress, 80);
        assert_eq!(record.counters.total, 4);

        reporter.begin_extraction().unwrap();
        let mut counters = Counters::with_total(4);
        counters.record_success();
        counters.record_success();
        reporter.extraction_progress(&counters);
        assert_eq!(stored(&store).progress, 90);
        assert_eq!(stored(&store).status.as_status(), "scraping");

        counters.record_failure();
        counters.record_skip();
        reporter.complete(counters).unwrap();
        let record = stored(&store);
        assert_eq!(record.status, JobPhase::Done);
        assert_eq!(record.progress, 100);
        assert_eq!(record.counters.done, 4);
    }

    #[test]
    fn test_discovery_progress_is_smoothed() {
        let (_dir, store, mut reporter) = reporter();
        reporter.begin_discovery().unwrap();

        reporter.discovery_progress(50);
        reporter.discovery_progress(30);
        assert_eq!(stored(&store).progress, 50);

        reporter.discovery_progress(200);
        assert_eq!(stored(&store).progress, 80);
    }

    #[test]
    fn test_done_never_decreases() {
        let (_dir, store, mut reporter) = reporter();
        reporter.begin_discovery().unwrap();
        reporter.discovery_done(3).unwrap();
        reporter.begin_extraction().unwrap();

        let mut later = Counters::with_total(3);
        later.record_success();
        later.record_success();
        reporter.extraction_progress(&later);

        let mut earlier = Counters::with_total(3);
        earlier.record_success();
        reporter.extraction_progress(&earlier);

        assert_eq!(stored(&store).counters.done, 2);
    }

    #[test]
    fn test_terminal_records_are_immutable() {
        let (_dir, store, mut reporter) = reporter();
        reporter.begin_discovery().unwrap();
        reporter.stop().unwrap();

        assert!(matches!(
            reporter.begin_extraction(),
            Err(SweepError::InvalidTransition { .. })
        ));
        assert!(reporter.fail("late").is_err());
        reporter.discovery_progress(70);

        let record = stored(&store);
        assert_eq!(record.status, JobPhase::Stopped);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_phases_cannot_be_skipped() {
        let (_dir, _store, mut reporter) = reporter();
        assert!(reporter.begin_extraction().is_err());
        assert!(reporter.complete(Counters::default()).is_err());
    }

    #[test]
    fn test_fail_records_message() {
        let (_dir, store, mut reporter) = reporter();
        reporter.begin_discovery().unwrap();
        reporter.discovery_progress(20);
        reporter.fail("fetch backend failure: gone").unwrap();

        let record = stored(&store);
        assert_eq!(record.status, JobPhase::Error);
        assert_eq!(record.progress, 20);
        assert_eq!(record.error.as_deref(), Some("fetch backend failure: gone"));
    }

    #[test]
    fn test_stop_from_starting() {
        let (_dir, store, mut reporter) = reporter();
        reporter.stop().unwrap();
        assert_eq!(stored(&store).status, JobPhase::Stopped);
    }
}
