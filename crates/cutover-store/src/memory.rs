//! In-memory repository implementations.
//!
//! State lives in a single `RwLock`-guarded map bundle shared by the three
//! repositories, so cross-entity invariants (the at-most-one-active-job check
//! in particular) are enforced under one write lock instead of a racy
//! check-then-create.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use cutover_core::{
    ArtifactKind, ArtifactSummary, ConnectionRepository, ConnectionRole, CreateConnectionRequest,
    CreateProjectRequest, DashboardStats, Error, ExtractionJob, ExtractionJobRepository,
    JobStatus, Project, ProjectRepository, ProjectStatus, Result, SourceConnection,
    SourceProjectRecord,
};

/// Shared mutable state behind all in-memory repositories.
#[derive(Default)]
struct MemoryState {
    projects: HashMap<Uuid, Project>,
    jobs: HashMap<Uuid, ExtractionJob>,
    connections: HashMap<Uuid, SourceConnection>,
}

type Shared = Arc<RwLock<MemoryState>>;

/// Create the three repositories over one shared state.
pub(crate) fn repositories() -> (
    MemoryProjectRepository,
    MemoryJobRepository,
    MemoryConnectionRepository,
) {
    let state: Shared = Arc::new(RwLock::new(MemoryState::default()));
    (
        MemoryProjectRepository {
            state: state.clone(),
        },
        MemoryJobRepository {
            state: state.clone(),
        },
        MemoryConnectionRepository { state },
    )
}

// =============================================================================
// PROJECTS
// =============================================================================

/// In-memory implementation of ProjectRepository.
pub struct MemoryProjectRepository {
    state: Shared,
}

/// Recompute the denormalized per-kind counts from the summary map.
///
/// A failed re-extraction zeroes the kind's summary, so counts always mirror
/// the latest summary state rather than the last success.
fn refresh_counts(project: &mut Project) {
    let count_of = |summaries: &HashMap<ArtifactKind, ArtifactSummary>, kind: ArtifactKind| {
        summaries
            .get(&kind)
            .filter(|s| s.extracted)
            .map(|s| s.count)
            .unwrap_or(0)
    };
    project.work_item_count = count_of(&project.artifact_summaries, ArtifactKind::WorkItems);
    project.repo_count = count_of(&project.artifact_summaries, ArtifactKind::Repositories);
    project.test_case_count = count_of(&project.artifact_summaries, ArtifactKind::TestCases);
    project.pipeline_count = count_of(&project.artifact_summaries, ArtifactKind::BuildPipelines)
        + count_of(&project.artifact_summaries, ArtifactKind::ReleasePipelines);
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn insert(&self, req: CreateProjectRequest) -> Result<Uuid> {
        let mut state = self.state.write().await;
        let id = Uuid::new_v4();
        state.projects.insert(
            id,
            Project {
                id,
                external_id: req.external_id,
                name: req.name,
                description: req.description,
                process_template: req.process_template,
                source_control: req.source_control,
                visibility: req.visibility,
                status: ProjectStatus::Ready,
                work_item_count: 0,
                repo_count: 0,
                test_case_count: 0,
                pipeline_count: 0,
                artifact_summaries: HashMap::new(),
                created_at: Utc::now(),
                synced_at: None,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Project> {
        let state = self.state.read().await;
        state
            .projects
            .get(&id)
            .cloned()
            .ok_or(Error::ProjectNotFound(id))
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let state = self.state.read().await;
        let mut projects: Vec<Project> = state.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.projects.contains_key(&id))
    }

    async fn upsert_synced(&self, record: &SourceProjectRecord) -> Result<Uuid> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(project) = state
            .projects
            .values_mut()
            .find(|p| p.external_id == record.id)
        {
            project.name = record.name.clone();
            project.description = record.description.clone();
            project.visibility = record.visibility.clone();
            project.process_template = record.process_template.clone();
            project.source_control = record.source_control.clone();
            project.synced_at = Some(now);
            return Ok(project.id);
        }

        let id = Uuid::new_v4();
        state.projects.insert(
            id,
            Project {
                id,
                external_id: record.id.clone(),
                name: record.name.clone(),
                description: record.description.clone(),
                process_template: record.process_template.clone(),
                source_control: record.source_control.clone(),
                visibility: record.visibility.clone(),
                status: ProjectStatus::Ready,
                work_item_count: 0,
                repo_count: 0,
                test_case_count: 0,
                pipeline_count: 0,
                artifact_summaries: HashMap::new(),
                created_at: record.last_update_time.unwrap_or(now),
                synced_at: Some(now),
            },
        );
        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: ProjectStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let project = state
            .projects
            .get_mut(&id)
            .ok_or(Error::ProjectNotFound(id))?;
        project.status = status;
        Ok(())
    }

    async fn put_artifact_summary(
        &self,
        id: Uuid,
        kind: ArtifactKind,
        summary: ArtifactSummary,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let project = state
            .projects
            .get_mut(&id)
            .ok_or(Error::ProjectNotFound(id))?;
        debug!(
            project_id = %id,
            artifact_kind = %kind,
            result_count = summary.count,
            success = summary.extracted,
            "Replacing artifact summary"
        );
        project.artifact_summaries.insert(kind, summary);
        refresh_counts(project);
        Ok(())
    }

    async fn stats(&self) -> Result<DashboardStats> {
        let state = self.state.read().await;
        let mut stats = DashboardStats {
            total_projects: state.projects.len() as i64,
            selected_projects: 0,
            in_progress_projects: 0,
            migrated_projects: 0,
        };
        for project in state.projects.values() {
            match project.status {
                ProjectStatus::Selected => stats.selected_projects += 1,
                ProjectStatus::InProgress => stats.in_progress_projects += 1,
                ProjectStatus::Migrated => stats.migrated_projects += 1,
                ProjectStatus::Ready => {}
            }
        }
        Ok(stats)
    }
}

// =============================================================================
// EXTRACTION JOBS
// =============================================================================

/// In-memory implementation of ExtractionJobRepository.
pub struct MemoryJobRepository {
    state: Shared,
}

/// Sort key placing active jobs first, then terminal jobs in completion
/// order (newest first).
fn history_key(job: &ExtractionJob) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        job.completed_at.unwrap_or(DateTime::<Utc>::MAX_UTC),
        job.started_at,
    )
}

#[async_trait]
impl ExtractionJobRepository for MemoryJobRepository {
    async fn create(&self, project_id: Uuid, kind: ArtifactKind) -> Result<ExtractionJob> {
        // Conflict check and insert happen under the same write lock.
        let mut state = self.state.write().await;

        if !state.projects.contains_key(&project_id) {
            return Err(Error::ProjectNotFound(project_id));
        }

        if let Some(active) = state
            .jobs
            .values()
            .find(|j| j.project_id == project_id && j.artifact_kind == kind && j.status.is_active())
        {
            return Err(Error::Conflict(format!(
                "extraction of {} already {} for project {} (job {})",
                kind,
                active.status_label(),
                project_id,
                active.id
            )));
        }

        let job = ExtractionJob {
            id: Uuid::new_v4(),
            project_id,
            artifact_kind: kind,
            status: JobStatus::Queued,
            progress_percent: 0,
            extracted_items: 0,
            total_items: 0,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<ExtractionJob> {
        let state = self.state.read().await;
        state
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(Error::JobNotFound(job_id))
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ExtractionJob>> {
        let state = self.state.read().await;
        let mut jobs: Vec<ExtractionJob> = state
            .jobs
            .values()
            .filter(|j| j.project_id == project_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| history_key(b).cmp(&history_key(a)));
        Ok(jobs)
    }

    async fn find_active(
        &self,
        project_id: Uuid,
        kind: ArtifactKind,
    ) -> Result<Option<ExtractionJob>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .find(|j| j.project_id == project_id && j.artifact_kind == kind && j.status.is_active())
            .cloned())
    }

    async fn mark_in_progress(&self, job_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let job = state.jobs.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))?;
        if job.status != JobStatus::Queued {
            return Err(Error::Conflict(format!(
                "job {} cannot enter in_progress from {}",
                job_id,
                job.status_label()
            )));
        }
        job.status = JobStatus::InProgress;
        Ok(())
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        extracted: i64,
        total: i64,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let job = state.jobs.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "job {} is terminal, progress is frozen",
                job_id
            )));
        }
        job.progress_percent = percent.clamp(0, 100);
        job.extracted_items = extracted;
        job.total_items = total;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, extracted: i64, total: i64) -> Result<()> {
        let mut state = self.state.write().await;
        let job = state.jobs.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(Error::Conflict(format!("job {} is already terminal", job_id)));
        }
        job.status = JobStatus::Completed;
        job.progress_percent = 100;
        job.extracted_items = extracted;
        job.total_items = total;
        job.completed_at = Some(Utc::now());
        job.error_message = None;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let job = state.jobs.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(Error::Conflict(format!("job {} is already terminal", job_id)));
        }
        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now());
        job.error_message = Some(error.to_string());
        Ok(())
    }
}

trait StatusLabel {
    fn status_label(&self) -> &'static str;
}

impl StatusLabel for ExtractionJob {
    fn status_label(&self) -> &'static str {
        match self.status {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// In-memory implementation of ConnectionRepository.
pub struct MemoryConnectionRepository {
    state: Shared,
}

#[async_trait]
impl ConnectionRepository for MemoryConnectionRepository {
    async fn upsert(&self, req: CreateConnectionRequest) -> Result<SourceConnection> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .connections
            .values_mut()
            .find(|c| c.organization == req.organization && c.role == req.role)
        {
            existing.name = req.name;
            existing.base_url = req.base_url;
            existing.token = req.token;
            existing.active = req.active;
            return Ok(existing.clone());
        }

        let conn = SourceConnection {
            id: Uuid::new_v4(),
            name: req.name,
            organization: req.organization,
            base_url: req.base_url,
            token: req.token,
            role: req.role,
            active: req.active,
            created_at: Utc::now(),
        };
        state.connections.insert(conn.id, conn.clone());
        Ok(conn)
    }

    async fn list_active(&self) -> Result<Vec<SourceConnection>> {
        let state = self.state.read().await;
        let mut conns: Vec<SourceConnection> = state
            .connections
            .values()
            .filter(|c| c.active)
            .cloned()
            .collect();
        conns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conns)
    }

    async fn active_for_role(&self, role: ConnectionRole) -> Result<Option<SourceConnection>> {
        let state = self.state.read().await;
        Ok(state
            .connections
            .values()
            .filter(|c| c.active && c.role == role)
            .max_by_key(|c| c.created_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store_with_project() -> (crate::Store, Uuid) {
        let store = crate::Store::in_memory();
        let id = store
            .projects
            .insert(CreateProjectRequest {
                external_id: "ext-1".into(),
                name: "Contoso".into(),
                description: None,
                process_template: None,
                source_control: None,
                visibility: None,
            })
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_create_job_conflict_while_active() {
        let (store, project_id) = store_with_project().await;

        let first = store
            .jobs
            .create(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();
        assert_eq!(first.status, JobStatus::Queued);

        let second = store.jobs.create(project_id, ArtifactKind::WorkItems).await;
        assert!(matches!(second, Err(Error::Conflict(_))));

        // A different kind for the same project is fine.
        store
            .jobs
            .create(project_id, ArtifactKind::Repositories)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_job_allowed_after_terminal() {
        let (store, project_id) = store_with_project().await;

        let job = store
            .jobs
            .create(project_id, ArtifactKind::AreaPaths)
            .await
            .unwrap();
        store.jobs.mark_in_progress(job.id).await.unwrap();
        store.jobs.fail(job.id, "boom").await.unwrap();

        store
            .jobs
            .create(project_id, ArtifactKind::AreaPaths)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_find_active_tracks_lifecycle() {
        let (store, project_id) = store_with_project().await;
        assert!(store
            .jobs
            .find_active(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap()
            .is_none());

        let job = store
            .jobs
            .create(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();
        let active = store
            .jobs
            .find_active(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, job.id);

        store.jobs.mark_in_progress(job.id).await.unwrap();
        store.jobs.complete(job.id, 0, 0).await.unwrap();
        assert!(store
            .jobs
            .find_active(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_create_job_unknown_project() {
        let store = crate::Store::in_memory();
        let err = store
            .jobs
            .create(Uuid::new_v4(), ArtifactKind::WorkItems)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_terminal_job_is_frozen() {
        let (store, project_id) = store_with_project().await;
        let job = store
            .jobs
            .create(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();
        store.jobs.mark_in_progress(job.id).await.unwrap();
        store.jobs.complete(job.id, 5, 5).await.unwrap();

        assert!(matches!(
            store.jobs.complete(job.id, 9, 9).await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            store.jobs.fail(job.id, "late").await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            store.jobs.update_progress(job.id, 10, 0, 0).await,
            Err(Error::Conflict(_))
        ));

        // Reads after terminal keep returning the same record.
        let a = store.jobs.get(job.id).await.unwrap();
        let b = store.jobs.get(job.id).await.unwrap();
        assert_eq!(a.status, JobStatus::Completed);
        assert_eq!(a.completed_at, b.completed_at);
        assert_eq!(a.extracted_items, 5);
    }

    #[tokio::test]
    async fn test_mark_in_progress_requires_queued() {
        let (store, project_id) = store_with_project().await;
        let job = store
            .jobs
            .create(project_id, ArtifactKind::WikiPages)
            .await
            .unwrap();
        store.jobs.mark_in_progress(job.id).await.unwrap();
        assert!(matches!(
            store.jobs.mark_in_progress(job.id).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_for_project_newest_first() {
        let (store, project_id) = store_with_project().await;

        let first = store
            .jobs
            .create(project_id, ArtifactKind::AreaPaths)
            .await
            .unwrap();
        store.jobs.mark_in_progress(first.id).await.unwrap();
        store.jobs.complete(first.id, 1, 1).await.unwrap();

        let second = store
            .jobs
            .create(project_id, ArtifactKind::AreaPaths)
            .await
            .unwrap();
        store.jobs.mark_in_progress(second.id).await.unwrap();
        store.jobs.complete(second.id, 2, 2).await.unwrap();

        let active = store
            .jobs
            .create(project_id, ArtifactKind::WorkItems)
            .await
            .unwrap();

        let history = store.jobs.list_for_project(project_id).await.unwrap();
        assert_eq!(history.len(), 3);
        // Active job first, then terminal jobs in completion order.
        assert_eq!(history[0].id, active.id);
        assert_eq!(history[1].id, second.id);
        assert_eq!(history[2].id, first.id);
    }

    #[tokio::test]
    async fn test_put_artifact_summary_replaces_and_counts() {
        let (store, project_id) = store_with_project().await;

        store
            .projects
            .put_artifact_summary(
                project_id,
                ArtifactKind::WorkItems,
                ArtifactSummary::ok(42, vec![json!({"id": 1})]),
            )
            .await
            .unwrap();
        store
            .projects
            .put_artifact_summary(
                project_id,
                ArtifactKind::BuildPipelines,
                ArtifactSummary::ok(3, vec![]),
            )
            .await
            .unwrap();
        store
            .projects
            .put_artifact_summary(
                project_id,
                ArtifactKind::ReleasePipelines,
                ArtifactSummary::ok(2, vec![]),
            )
            .await
            .unwrap();

        let project = store.projects.get(project_id).await.unwrap();
        assert_eq!(project.work_item_count, 42);
        assert_eq!(project.pipeline_count, 5);

        // A failed re-extraction regresses the summary and the count.
        store
            .projects
            .put_artifact_summary(
                project_id,
                ArtifactKind::WorkItems,
                ArtifactSummary::failed("upstream timeout"),
            )
            .await
            .unwrap();
        let project = store.projects.get(project_id).await.unwrap();
        let summary = &project.artifact_summaries[&ArtifactKind::WorkItems];
        assert!(!summary.extracted);
        assert!(summary.error.is_some());
        assert_eq!(project.work_item_count, 0);
    }

    #[tokio::test]
    async fn test_upsert_synced_dedupes_on_external_id() {
        let store = crate::Store::in_memory();
        let record = SourceProjectRecord {
            id: "abc".into(),
            name: "Alpha".into(),
            description: None,
            visibility: Some("private".into()),
            state: Some("wellFormed".into()),
            process_template: Some("Agile".into()),
            source_control: Some("Git".into()),
            last_update_time: None,
        };

        let first = store.projects.upsert_synced(&record).await.unwrap();
        let mut renamed = record.clone();
        renamed.name = "Alpha Renamed".into();
        let second = store.projects.upsert_synced(&renamed).await.unwrap();

        assert_eq!(first, second);
        let projects = store.projects.list().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Alpha Renamed");
        assert!(projects[0].synced_at.is_some());
    }

    #[tokio::test]
    async fn test_stats_counts_statuses() {
        let store = crate::Store::in_memory();
        for (name, status) in [
            ("a", ProjectStatus::Ready),
            ("b", ProjectStatus::Selected),
            ("c", ProjectStatus::Migrated),
            ("d", ProjectStatus::Migrated),
        ] {
            let id = store
                .projects
                .insert(CreateProjectRequest {
                    external_id: name.into(),
                    name: name.into(),
                    description: None,
                    process_template: None,
                    source_control: None,
                    visibility: None,
                })
                .await
                .unwrap();
            store.projects.update_status(id, status).await.unwrap();
        }

        let stats = store.projects.stats().await.unwrap();
        assert_eq!(stats.total_projects, 4);
        assert_eq!(stats.selected_projects, 1);
        assert_eq!(stats.in_progress_projects, 0);
        assert_eq!(stats.migrated_projects, 2);
    }

    #[tokio::test]
    async fn test_connection_upsert_keyed_by_org_and_role() {
        let store = crate::Store::in_memory();
        let first = store
            .connections
            .upsert(CreateConnectionRequest {
                name: "prod".into(),
                organization: "contoso".into(),
                base_url: "https://dev.azure.com/contoso".into(),
                token: "pat-1".into(),
                role: ConnectionRole::Source,
                active: true,
            })
            .await
            .unwrap();

        let replaced = store
            .connections
            .upsert(CreateConnectionRequest {
                name: "prod-rotated".into(),
                organization: "contoso".into(),
                base_url: "https://dev.azure.com/contoso".into(),
                token: "pat-2".into(),
                role: ConnectionRole::Source,
                active: true,
            })
            .await
            .unwrap();

        assert_eq!(first.id, replaced.id);
        assert_eq!(replaced.token, "pat-2");

        let active = store
            .connections
            .active_for_role(ConnectionRole::Source)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.name, "prod-rotated");
        assert!(store
            .connections
            .active_for_role(ConnectionRole::Target)
            .await
            .unwrap()
            .is_none());
    }
}
