//! Job runner
//!
//! Owns the map of live jobs. Each submitted crawl runs in its own supervised
//! task that races the engine against a cancellation token, catches engine
//! panics, and writes the job's terminal record itself.

use crate::config::Config;
use crate::crawler::{Coordinator, CrawlContext};
use crate::jobs::reporter::ProgressReporter;
use crate::storage::{open_progress_store, ProgressSnapshot, ProgressStore};
use crate::url::{canonicalize_seed, CanonicalUrl};
use crate::{Result, SweepError};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Opaque job identifier
///
/// Restricted to `[A-Za-z0-9_.-]` (not starting with `.`) because it names
/// the job's progress record on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    /// Generates a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.len() <= 128
            && !s.starts_with('.')
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(SweepError::InvalidJobId(s.to_string()))
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live handle to a submitted job
struct JobHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    finished: watch::Receiver<Option<ProgressSnapshot>>,
}

/// Spawns, tracks and cancels crawl jobs
pub struct JobRunner {
    context: CrawlContext,
    store: Arc<dyn ProgressStore>,
    jobs: Mutex<HashMap<JobId, JobHandle>>,
}

impl JobRunner {
    pub fn new(context: CrawlContext, store: Arc<dyn ProgressStore>) -> Self {
        Self {
            context,
            store,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a runner with the HTTP fetcher and the configured stores
    pub fn from_config(config: &Config) -> Result<Self> {
        let context = CrawlContext::from_config(config)?;
        let store = open_progress_store(&config.output)?;
        Ok(Self::new(context, store))
    }

    pub fn store(&self) -> &Arc<dyn ProgressStore> {
        &self.store
    }

    /// Starts a crawl of `url`
    ///
    /// The job's `starting` record exists before this returns. Reusing the id
    /// of a job that is still running is rejected; a finished job's id may be
    /// reused and its record is replaced.
    pub async fn submit(&self, url: &str, job_id: Option<JobId>) -> Result<JobId> {
        let seed = canonicalize_seed(url)?;
        let job_id = job_id.unwrap_or_else(JobId::generate);

        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(&job_id) {
            if !existing.task.is_finished() {
                return Err(SweepError::JobAlreadyRunning(job_id.to_string()));
            }
        }

        // Finished jobs are served from the store from here on
        jobs.retain(|_, handle| !handle.task.is_finished());

        let reporter = ProgressReporter::start(Arc::clone(&self.store), job_id.as_str(), seed.as_str())?;
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(None);

        let coordinator = Coordinator::new(self.context.clone(), seed.clone());
        let task = tokio::spawn(supervise(coordinator, reporter, token.clone(), tx));

        tracing::info!("Job {} submitted for {}", job_id, seed);
        jobs.insert(
            job_id.clone(),
            JobHandle {
                token,
                task,
                finished: rx,
            },
        );

        Ok(job_id)
    }

    /// Waits for a job to reach a terminal phase and returns its final record
    pub async fn wait(&self, job_id: &JobId) -> Result<ProgressSnapshot> {
        let finished = {
            let jobs = self.jobs.lock().await;
            jobs.get(job_id).map(|handle| handle.finished.clone())
        };

        match finished {
            Some(rx) => self.await_terminal(job_id, rx).await,
            None => self.terminal_record(job_id),
        }
    }

    /// Requests cancellation and waits for the `stopped` record
    ///
    /// Stopping a job that already finished returns its final record unchanged.
    pub async fn stop(&self, job_id: &JobId) -> Result<ProgressSnapshot> {
        let finished = {
            let jobs = self.jobs.lock().await;
            jobs.get(job_id).map(|handle| {
                handle.token.cancel();
                handle.finished.clone()
            })
        };

        match finished {
            Some(rx) => {
                tracing::info!("Stopping job {}", job_id);
                self.await_terminal(job_id, rx).await
            }
            None => self.terminal_record(job_id),
        }
    }

    /// Stops every running job; returns the ids that were running
    pub async fn stop_all(&self) -> Vec<JobId> {
        let running: Vec<(JobId, watch::Receiver<Option<ProgressSnapshot>>)> = {
            let jobs = self.jobs.lock().await;
            jobs.iter()
                .filter(|(_, handle)| !handle.task.is_finished())
                .map(|(id, handle)| {
                    handle.token.cancel();
                    (id.clone(), handle.finished.clone())
                })
                .collect()
        };

        let mut stopped = Vec::with_capacity(running.len());
        for (job_id, rx) in running {
            if let Err(e) = self.await_terminal(&job_id, rx).await {
                tracing::warn!("Job {} did not stop cleanly: {}", job_id, e);
            }
            stopped.push(job_id);
        }
        stopped.sort();
        stopped
    }

    /// Stops the job if needed and removes its record
    ///
    /// Returns false if no record existed.
    pub async fn delete(&self, job_id: &JobId) -> Result<bool> {
        let handle = self.jobs.lock().await.remove(job_id);
        if let Some(handle) = handle {
            handle.token.cancel();
            if let Err(e) = handle.task.await {
                tracing::warn!("Job {} task ended abnormally: {}", job_id, e);
            }
        }

        let removed = self.store.delete(job_id.as_str())?;
        if removed {
            tracing::info!("Deleted job {}", job_id);
        }
        Ok(removed)
    }

    /// Latest record of a job, live or historical
    pub fn progress(&self, job_id: &JobId) -> Result<Option<ProgressSnapshot>> {
        Ok(self.store.read(job_id.as_str())?)
    }

    /// Every known record, newest first
    pub fn activity(&self) -> Result<Vec<(String, ProgressSnapshot)>> {
        Ok(self.store.list()?)
    }

    /// Ids of jobs whose task has not finished
    pub async fn running(&self) -> Vec<JobId> {
        let jobs = self.jobs.lock().await;
        let mut ids: Vec<JobId> = jobs
            .iter()
            .filter(|(_, handle)| !handle.task.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    async fn await_terminal(
        &self,
        job_id: &JobId,
        mut rx: watch::Receiver<Option<ProgressSnapshot>>,
    ) -> Result<ProgressSnapshot> {
        let outcome = rx.wait_for(Option::is_some).await.map(|snapshot| snapshot.clone());
        match outcome {
            Ok(Some(snapshot)) => Ok(snapshot),
            // The task went away without reporting; the store has the last word
            _ => self.terminal_record(job_id),
        }
    }

    fn terminal_record(&self, job_id: &JobId) -> Result<ProgressSnapshot> {
        match self.store.read(job_id.as_str())? {
            Some(snapshot) if snapshot.status.is_terminal() => Ok(snapshot),
            _ => Err(SweepError::JobNotFound(job_id.to_string())),
        }
    }
}

/// Body of every job task
async fn supervise(
    coordinator: Coordinator,
    mut reporter: ProgressReporter,
    token: CancellationToken,
    finished: watch::Sender<Option<ProgressSnapshot>>,
) {
    let job_id = reporter.job_id().to_string();
    let seed: CanonicalUrl = coordinator.seed().clone();

    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = AssertUnwindSafe(coordinator.run(&mut reporter)).catch_unwind() => Some(result),
    };

    let recorded = match outcome {
        None => {
            tracing::info!("Job {} stopped", job_id);
            reporter.stop()
        }
        Some(Ok(Ok(report))) => {
            tracing::info!(
                "Job {} done: {} extracted, {} unchanged, {} failed ({})",
                job_id,
                report.counters.success,
                report.counters.skipped,
                report.counters.failed,
                seed
            );
            reporter.complete(report.counters)
        }
        Some(Ok(Err(e))) => {
            tracing::error!("Job {} failed: {}", job_id, e);
            reporter.fail(e.to_string())
        }
        Some(Err(panic)) => {
            let message = panic_message(panic.as_ref());
            tracing::error!("Job {} panicked: {}", job_id, message);
            reporter.fail(format!("engine panicked: {}", message))
        }
    };

    if let Err(e) = recorded {
        tracing::warn!("Job {}: could not record final state: {}", job_id, e);
    }

    finished.send_replace(Some(reporter.snapshot().clone()));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
