//! Consumer-side job status poller.
//!
//! After a job is started the client polls its status on a fixed tick until
//! it reaches a terminal state, then reconciles the outcome into the local
//! [`ProjectCache`] exactly once. Polling is bounded by an absolute ceiling;
//! expiry means "still unknown", never a fabricated failure. The watch task
//! is cancellable and bound to its handle's lifetime, so a torn-down view
//! leaves no orphaned timers while the server-side job keeps running.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use cutover_core::{
    defaults, ArtifactKind, ArtifactSummary, ExtractionJob, JobStatus, Project, Result,
};

use crate::manager::ExtractionManager;

/// Read-side capability the poller consumes: job status plus the project
/// summary to merge on terminal observation.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Current job record.
    async fn status(&self, job_id: Uuid) -> Result<ExtractionJob>;

    /// Project record including artifact summaries.
    async fn project(&self, project_id: Uuid) -> Result<Project>;
}

#[async_trait]
impl StatusSource for ExtractionManager {
    async fn status(&self, job_id: Uuid) -> Result<ExtractionJob> {
        self.job_status(job_id).await
    }

    async fn project(&self, project_id: Uuid) -> Result<Project> {
        self.project_summary(project_id).await
    }
}

/// Consumer-local cache of project extraction state.
///
/// Reconciliation is keyed by job id: the first observer of a terminal job
/// wins, every later observer is a no-op, so racing pollers produce exactly
/// one history append, one summary merge, and one notification.
#[derive(Default)]
pub struct ProjectCache {
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    summaries: HashMap<Uuid, HashMap<ArtifactKind, ArtifactSummary>>,
    history: HashMap<Uuid, Vec<ExtractionJob>>,
    reconciled: HashSet<Uuid>,
    notifications: Vec<String>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim reconciliation of a job. Returns false when the job was already
    /// reconciled by another observer.
    fn begin_reconcile(&self, job_id: Uuid) -> bool {
        self.inner.lock().unwrap().reconciled.insert(job_id)
    }

    /// Apply a terminal job to the cache. Only ever called by the observer
    /// that won `begin_reconcile`.
    fn apply(&self, job: ExtractionJob, summary: Option<ArtifactSummary>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(summary) = summary {
            inner
                .summaries
                .entry(job.project_id)
                .or_default()
                .insert(job.artifact_kind, summary);
        }
        let notification = match job.status {
            JobStatus::Failed => format!(
                "Extraction of {} failed: {}",
                job.artifact_kind,
                job.error_message.as_deref().unwrap_or("unknown error")
            ),
            _ => format!(
                "Extraction of {} completed ({} items)",
                job.artifact_kind, job.extracted_items
            ),
        };
        inner.notifications.push(notification);
        inner
            .history
            .entry(job.project_id)
            .or_default()
            .insert(0, job);
    }

    /// Cached summary for a (project, kind) pair.
    pub fn summary(&self, project_id: Uuid, kind: ArtifactKind) -> Option<ArtifactSummary> {
        self.inner
            .lock()
            .unwrap()
            .summaries
            .get(&project_id)
            .and_then(|m| m.get(&kind))
            .cloned()
    }

    /// Cached history for a project, newest first.
    pub fn history(&self, project_id: Uuid) -> Vec<ExtractionJob> {
        self.inner
            .lock()
            .unwrap()
            .history
            .get(&project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// User-facing notifications fired so far, in order.
    pub fn notifications(&self) -> Vec<String> {
        self.inner.lock().unwrap().notifications.clone()
    }

    /// How many jobs have been reconciled.
    pub fn reconciled_count(&self) -> usize {
        self.inner.lock().unwrap().reconciled.len()
    }
}

/// Configuration for the job poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fixed tick interval.
    pub interval: Duration,
    /// Absolute ceiling on one polling session.
    pub ceiling: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            ceiling: Duration::from_secs(defaults::POLL_CEILING_SECS),
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }
}

/// Outcome of one polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Terminal state observed and reconciled by this poller.
    Reconciled(JobStatus),
    /// Terminal state observed, but another observer already reconciled it.
    AlreadyReconciled(JobStatus),
    /// Ceiling expired with the job still unresolved. The job is unknown,
    /// not failed; a later status query can still observe its terminal
    /// state.
    TimedOut,
}

/// Polls one job until terminal and reconciles it into the shared cache.
pub struct JobPoller<S: StatusSource + 'static> {
    source: Arc<S>,
    cache: Arc<ProjectCache>,
    config: PollerConfig,
}

impl<S: StatusSource + 'static> Clone for JobPoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cache: self.cache.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: StatusSource + 'static> JobPoller<S> {
    pub fn new(source: Arc<S>, cache: Arc<ProjectCache>) -> Self {
        Self {
            source,
            cache,
            config: PollerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Poll until the job is terminal, the shared cache has absorbed it, or
    /// the ceiling expires.
    pub async fn poll_until_terminal(&self, job_id: Uuid) -> PollOutcome {
        match tokio::time::timeout(self.config.ceiling, self.poll_loop(job_id)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(job_id = %job_id, "Polling ceiling reached, job still unresolved");
                PollOutcome::TimedOut
            }
        }
    }

    /// Spawn a cancellable watch task. Dropping the handle aborts the task,
    /// so a poller scoped to a view dies with it; the server-side job is
    /// unaffected.
    pub fn watch(&self, job_id: Uuid) -> PollHandle {
        let poller = self.clone();
        let task = tokio::spawn(async move { poller.poll_until_terminal(job_id).await });
        PollHandle { task: Some(task) }
    }

    async fn poll_loop(&self, job_id: Uuid) -> PollOutcome {
        let mut interval = tokio::time::interval(self.config.interval);
        // Ticks never overlap: the status request is awaited before the next
        // tick, and a delayed tick shifts the schedule instead of bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.source.status(job_id).await {
                Ok(job) if job.status.is_terminal() => return self.reconcile(job).await,
                Ok(_) => {}
                Err(e) => {
                    // Transient read failures do not end the session.
                    warn!(job_id = %job_id, error = %e, "Status poll failed, retrying");
                }
            }
        }
    }

    async fn reconcile(&self, job: ExtractionJob) -> PollOutcome {
        let status = job.status;
        if !self.cache.begin_reconcile(job.id) {
            return PollOutcome::AlreadyReconciled(status);
        }

        let summary = match self.source.project(job.project_id).await {
            Ok(project) => project.artifact_summaries.get(&job.artifact_kind).cloned(),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Failed to refresh project summary");
                None
            }
        };
        self.cache.apply(job, summary);
        PollOutcome::Reconciled(status)
    }
}

/// Handle to a spawned watch task. Aborts the task on drop.
pub struct PollHandle {
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Stop watching. The underlying job keeps running server-side.
    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait for the session to finish. None if the task was cancelled.
    pub async fn join(mut self) -> Option<PollOutcome> {
        match self.task.take() {
            Some(task) => task.await.ok(),
            None => None,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
