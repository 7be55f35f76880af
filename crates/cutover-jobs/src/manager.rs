//! Extraction job manager: lifecycle, conflict enforcement, and fan-out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use cutover_core::{
    defaults, ArtifactKind, ArtifactSource, Error, ExtractionJob, Project, Result,
};
use cutover_store::Store;

use crate::aggregator::ProgressAggregator;
use crate::fetcher::{FetchContext, FetchError};
use crate::registry::FetcherRegistry;

/// Configuration for the extraction manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Hard deadline for a single artifact fetch (seconds). Expiry forces
    /// the job into `failed` instead of leaving it in_progress forever.
    pub fetch_timeout_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: defaults::FETCH_TIMEOUT_SECS,
        }
    }
}

impl ManagerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CUTOVER_FETCH_TIMEOUT_SECS` | `120` | Per-fetch hard deadline |
    pub fn from_env() -> Self {
        let fetch_timeout_secs = std::env::var("CUTOVER_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::FETCH_TIMEOUT_SECS);
        Self { fetch_timeout_secs }
    }

    /// Set the per-fetch timeout.
    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }
}

/// Event emitted by the extraction manager.
#[derive(Debug, Clone)]
pub enum ExtractionEvent {
    /// A job was accepted and its fetch dispatched.
    JobStarted {
        job_id: Uuid,
        project_id: Uuid,
        kind: ArtifactKind,
    },
    /// Best-effort progress update.
    JobProgress { job_id: Uuid, percent: i32 },
    /// A job completed and its summary was aggregated.
    JobCompleted {
        job_id: Uuid,
        kind: ArtifactKind,
        extracted_items: i64,
    },
    /// A job failed; the error is captured on the job record.
    JobFailed {
        job_id: Uuid,
        kind: ArtifactKind,
        error: String,
    },
}

/// Per-kind outcome of a batch start request.
///
/// A batch is reported as the set of per-kind outcomes, never collapsed into
/// one success/failure flag: a conflict on one kind leaves the others
/// running.
#[derive(Debug)]
pub struct StartOutcome {
    pub kind: ArtifactKind,
    pub result: Result<Uuid>,
}

/// Drives extraction jobs for (project, artifact kind) pairs.
///
/// `start` is synchronous up to job creation: the at-most-one-active
/// invariant is enforced atomically at the repository, the job id returns
/// immediately, and the fetch runs on a spawned task so callers can begin
/// polling before it resolves.
pub struct ExtractionManager {
    store: Store,
    source: Arc<dyn ArtifactSource>,
    registry: Arc<FetcherRegistry>,
    config: ManagerConfig,
    event_tx: broadcast::Sender<ExtractionEvent>,
}

impl ExtractionManager {
    /// Create a manager with the standard fetcher registry.
    pub fn new(store: Store, source: Arc<dyn ArtifactSource>) -> Self {
        Self::with_registry(store, source, FetcherRegistry::standard())
    }

    /// Create a manager with a custom registry.
    pub fn with_registry(
        store: Store,
        source: Arc<dyn ArtifactSource>,
        registry: FetcherRegistry,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            source,
            registry: Arc::new(registry),
            config: ManagerConfig::default(),
            event_tx,
        }
    }

    /// Set the manager configuration.
    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a receiver for extraction events.
    pub fn events(&self) -> broadcast::Receiver<ExtractionEvent> {
        self.event_tx.subscribe()
    }

    /// Start extraction of one artifact kind for a project.
    ///
    /// Returns the job id as soon as the job record exists; the fetch is
    /// dispatched asynchronously. Fails with `Error::Conflict` while a job
    /// for the same pair is active, and `Error::ProjectNotFound` for unknown
    /// projects.
    pub async fn start(&self, project_id: Uuid, kind: ArtifactKind) -> Result<Uuid> {
        let project = self.store.projects.get(project_id).await?;

        if !self.registry.has_fetcher(kind) {
            return Err(Error::InvalidInput(format!(
                "no fetcher registered for artifact kind {}",
                kind
            )));
        }

        let job = self.store.jobs.create(project_id, kind).await?;
        let job_id = job.id;
        self.store.jobs.mark_in_progress(job_id).await?;

        info!(
            job_id = %job_id,
            project_id = %project_id,
            artifact_kind = %kind,
            "Extraction job started"
        );
        let _ = self.event_tx.send(ExtractionEvent::JobStarted {
            job_id,
            project_id,
            kind,
        });

        let task = self.task_ref();
        tokio::spawn(async move {
            task.execute(job, project).await;
        });

        Ok(job_id)
    }

    /// Start extraction of several artifact kinds at once.
    ///
    /// One job per kind; fetches run concurrently. The returned outcome set
    /// carries a job id or the per-kind start error.
    pub async fn start_batch(
        &self,
        project_id: Uuid,
        kinds: &[ArtifactKind],
    ) -> Vec<StartOutcome> {
        let mut outcomes = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            outcomes.push(StartOutcome {
                kind,
                result: self.start(project_id, kind).await,
            });
        }
        outcomes
    }

    /// Current job record. Pure read backing the polling contract.
    pub async fn job_status(&self, job_id: Uuid) -> Result<ExtractionJob> {
        self.store.jobs.get(job_id).await
    }

    /// Extraction history for a project, newest first.
    pub async fn jobs_for_project(&self, project_id: Uuid) -> Result<Vec<ExtractionJob>> {
        self.store.jobs.list_for_project(project_id).await
    }

    /// Project record including artifact summaries.
    pub async fn project_summary(&self, project_id: Uuid) -> Result<Project> {
        self.store.projects.get(project_id).await
    }

    /// Clone references needed for a spawned fetch task.
    fn task_ref(&self) -> ExtractionTask {
        ExtractionTask {
            store: self.store.clone(),
            source: self.source.clone(),
            registry: self.registry.clone(),
            aggregator: ProgressAggregator::new(self.store.clone()),
            event_tx: self.event_tx.clone(),
            fetch_timeout_secs: self.config.fetch_timeout_secs,
        }
    }
}

/// Reference bundle for executing a single fetch on a spawned task.
struct ExtractionTask {
    store: Store,
    source: Arc<dyn ArtifactSource>,
    registry: Arc<FetcherRegistry>,
    aggregator: ProgressAggregator,
    event_tx: broadcast::Sender<ExtractionEvent>,
    fetch_timeout_secs: u64,
}

impl ExtractionTask {
    async fn execute(self, job: ExtractionJob, project: Project) {
        let start = Instant::now();
        let job_id = job.id;
        let kind = job.artifact_kind;
        let project_id = job.project_id;

        let event_tx = self.event_tx.clone();
        let progress_store = self.store.clone();
        let ctx = FetchContext::new(project, self.source.clone()).with_progress_callback(
            move |percent, extracted, total| {
                let _ = event_tx.send(ExtractionEvent::JobProgress { job_id, percent });
                let store = progress_store.clone();
                tokio::spawn(async move {
                    // Best-effort; a progress write racing completion is
                    // rejected by the store and dropped here.
                    let _ = store
                        .jobs
                        .update_progress(job_id, percent, extracted, total)
                        .await;
                });
            },
        );

        let fetch_timeout = Duration::from_secs(self.fetch_timeout_secs);
        let outcome = match tokio::time::timeout(fetch_timeout, self.registry.fetch(kind, &ctx))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(format!(
                "artifact fetch timed out after {}s",
                self.fetch_timeout_secs
            ))),
        };

        match outcome {
            Ok(summary) => {
                let extracted_items = summary.count;
                if let Err(e) = self
                    .aggregator
                    .record_success(job_id, project_id, kind, summary)
                    .await
                {
                    error!(job_id = %job_id, error = %e, "Failed to aggregate extraction result");
                    return;
                }
                info!(
                    job_id = %job_id,
                    artifact_kind = %kind,
                    result_count = extracted_items,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Extraction job completed"
                );
                let _ = self.event_tx.send(ExtractionEvent::JobCompleted {
                    job_id,
                    kind,
                    extracted_items,
                });
            }
            Err(e) => {
                if let Err(agg_err) = self
                    .aggregator
                    .record_failure(job_id, project_id, kind, &e.message)
                    .await
                {
                    error!(job_id = %job_id, error = %agg_err, "Failed to record extraction failure");
                    return;
                }
                warn!(
                    job_id = %job_id,
                    artifact_kind = %kind,
                    error = %e.message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Extraction job failed"
                );
                let _ = self.event_tx.send(ExtractionEvent::JobFailed {
                    job_id,
                    kind,
                    error: e.message,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manager_fixture, wait_terminal};
    use cutover_ado::{MockArtifactSource, MockFailure};
    use cutover_core::{JobStatus, WorkItemRecord};
    use serde_json::json;

    #[test]
    fn test_manager_config_default() {
        let config = ManagerConfig::default();
        assert_eq!(config.fetch_timeout_secs, defaults::FETCH_TIMEOUT_SECS);
    }

    #[test]
    fn test_manager_config_with_fetch_timeout() {
        let config = ManagerConfig::default().with_fetch_timeout(5);
        assert_eq!(config.fetch_timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_start_unknown_project() {
        let (manager, _store) = manager_fixture(MockArtifactSource::new()).await;
        let err = manager
            .start(Uuid::new_v4(), ArtifactKind::WorkItems)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_second_start_conflicts_while_active() {
        let source = MockArtifactSource::new().with_latency(Duration::from_millis(200));
        let (manager, store) = manager_fixture(source).await;
        let project_id = store.projects.list().await.unwrap()[0].id;

        let job_id = manager
            .start(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();
        let err = manager
            .start(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Once terminal, a new start is permitted.
        wait_terminal(&manager, job_id).await;
        manager
            .start(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_work_items_completes_empty() {
        let (manager, store) = manager_fixture(MockArtifactSource::new()).await;
        let project_id = store.projects.list().await.unwrap()[0].id;

        let job_id = manager
            .start(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();
        let job = wait_terminal(&manager, job_id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.extracted_items, 0);
        assert_eq!(job.progress_percent, 100);

        let project = manager.project_summary(project_id).await.unwrap();
        let summary = &project.artifact_summaries[&ArtifactKind::WorkItems];
        assert!(summary.extracted);
        assert_eq!(summary.count, 0);
        assert!(summary.items.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_timeout_fails_job() {
        let source = MockArtifactSource::new()
            .with_failure("repositories", MockFailure::timeout("connect timed out"));
        let (manager, store) = manager_fixture(source).await;
        let project_id = store.projects.list().await.unwrap()[0].id;

        let job_id = manager
            .start(project_id, ArtifactKind::Repositories)
            .await
            .unwrap();
        let job = wait_terminal(&manager, job_id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .to_lowercase()
            .contains("timeout"));

        let project = manager.project_summary(project_id).await.unwrap();
        assert!(!project.artifact_summaries[&ArtifactKind::Repositories].extracted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_forced_failed_by_deadline() {
        let source = MockArtifactSource::new().with_latency(Duration::from_secs(600));
        let (manager, store) = manager_fixture(source).await;
        let manager = manager.with_config(ManagerConfig::default().with_fetch_timeout(2));
        let project_id = store.projects.list().await.unwrap()[0].id;

        let job_id = manager
            .start(project_id, ArtifactKind::AreaPaths)
            .await
            .unwrap();
        let job = wait_terminal(&manager, job_id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_batch_outcomes_are_independent() {
        let source = MockArtifactSource::new()
            .with_work_items(
                vec![1],
                vec![WorkItemRecord {
                    id: 1,
                    fields: json!({"System.Title": "t"}),
                }],
            )
            .with_failure("repositories", MockFailure::timeout("down"));
        let (manager, store) = manager_fixture(source).await;
        let project_id = store.projects.list().await.unwrap()[0].id;

        let outcomes = manager
            .start_batch(
                project_id,
                &[ArtifactKind::WorkItems, ArtifactKind::Repositories],
            )
            .await;
        assert_eq!(outcomes.len(), 2);
        let work_items_job = outcomes[0].result.as_ref().unwrap();
        let repos_job = outcomes[1].result.as_ref().unwrap();

        let wi = wait_terminal(&manager, *work_items_job).await;
        let repos = wait_terminal(&manager, *repos_job).await;

        // The repositories failure does not poison the work items result.
        assert_eq!(wi.status, JobStatus::Completed);
        assert_eq!(wi.extracted_items, 1);
        assert_eq!(repos.status, JobStatus::Failed);

        let project = manager.project_summary(project_id).await.unwrap();
        assert!(project.artifact_summaries[&ArtifactKind::WorkItems].extracted);
        assert!(!project.artifact_summaries[&ArtifactKind::Repositories].extracted);
    }

    #[tokio::test]
    async fn test_events_emitted_for_lifecycle() {
        let (manager, store) = manager_fixture(MockArtifactSource::new()).await;
        let project_id = store.projects.list().await.unwrap()[0].id;
        let mut events = manager.events();

        let job_id = manager
            .start(project_id, ArtifactKind::TestPlans)
            .await
            .unwrap();
        wait_terminal(&manager, job_id).await;

        let mut saw_started = false;
        let mut saw_completed = false;
        while let Ok(event) = events.try_recv() {
            match event {
                ExtractionEvent::JobStarted { job_id: id, .. } if id == job_id => {
                    saw_started = true;
                }
                ExtractionEvent::JobCompleted { job_id: id, .. } if id == job_id => {
                    saw_completed = true;
                }
                _ => {}
            }
        }
        assert!(saw_started);
        assert!(saw_completed);
    }

    #[tokio::test]
    async fn test_job_status_idempotent_after_terminal() {
        let (manager, store) = manager_fixture(MockArtifactSource::new()).await;
        let project_id = store.projects.list().await.unwrap()[0].id;

        let job_id = manager
            .start(project_id, ArtifactKind::WikiPages)
            .await
            .unwrap();
        let first = wait_terminal(&manager, job_id).await;

        for _ in 0..5 {
            let again = manager.job_status(job_id).await.unwrap();
            assert_eq!(again.status, first.status);
            assert_eq!(again.completed_at, first.completed_at);
            assert_eq!(again.extracted_items, first.extracted_items);
        }
    }
}
