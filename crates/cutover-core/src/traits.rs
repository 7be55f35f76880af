//! Core traits for cutover abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability: the artifact source
//! is a remote capability, and storage is an opaque repository.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ARTIFACT SOURCE
// =============================================================================

/// Remote capability exposing the source instance's per-artifact endpoints.
///
/// Every method is a suspension point and can fail independently (auth, rate
/// limit, timeout, malformed payload). Implementations must map transport
/// failures onto the `Upstream*` error variants; they must not panic.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// List projects visible to the connection. Used by sync.
    async fn projects(&self) -> Result<Vec<SourceProjectRecord>>;

    /// Cheap credential probe.
    async fn test_connection(&self) -> Result<bool>;

    /// Flattened area or iteration tree for a project.
    async fn classification_nodes(
        &self,
        project: &str,
        group: ClassificationGroup,
    ) -> Result<Vec<ClassificationNode>>;

    /// Work item type definitions.
    async fn work_item_types(&self, project: &str) -> Result<Vec<WorkItemTypeRecord>>;

    /// Work item field definitions (includes custom fields).
    async fn fields(&self, project: &str) -> Result<Vec<FieldRecord>>;

    /// Board columns across all the project's teams.
    async fn board_columns(&self, project: &str) -> Result<Vec<BoardColumnRecord>>;

    /// Wiki pages across the project's wikis.
    async fn wiki_pages(&self, project: &str) -> Result<Vec<WikiPageRecord>>;

    /// Query step: matching work item ids ordered ascending, capped at `cap`.
    async fn work_item_ids(&self, project: &str, cap: usize) -> Result<Vec<i64>>;

    /// Batch step: expand all fields for the given ids.
    async fn work_items(&self, project: &str, ids: &[i64]) -> Result<Vec<WorkItemRecord>>;

    /// Git repositories in the project.
    async fn repositories(&self, project: &str) -> Result<Vec<RepositoryRecord>>;

    /// Branch heads of one repository.
    async fn branches(&self, project: &str, repo_id: &str) -> Result<Vec<BranchRecord>>;

    /// Most recent commits of one repository, newest first, at most `top`.
    async fn commits(&self, project: &str, repo_id: &str, top: usize)
        -> Result<Vec<CommitRecord>>;

    /// Most recent pull requests of one repository, at most `top`.
    async fn pull_requests(
        &self,
        project: &str,
        repo_id: &str,
        top: usize,
    ) -> Result<Vec<PullRequestRecord>>;

    /// Test plans in the project.
    async fn test_plans(&self, project: &str) -> Result<Vec<TestPlanRecord>>;

    /// Test suites of one plan.
    async fn test_suites(&self, project: &str, plan_id: i64) -> Result<Vec<TestSuiteRecord>>;

    /// Test cases of one suite.
    async fn test_cases(
        &self,
        project: &str,
        plan_id: i64,
        suite_id: i64,
    ) -> Result<Vec<TestCaseRecord>>;

    /// Recent test results across the project's runs.
    async fn test_results(&self, project: &str) -> Result<Vec<TestResultRecord>>;

    /// Build pipeline definitions.
    async fn build_pipelines(&self, project: &str) -> Result<Vec<PipelineRecord>>;

    /// Release pipeline definitions.
    async fn release_pipelines(&self, project: &str) -> Result<Vec<PipelineRecord>>;

    /// Runs of one pipeline.
    async fn pipeline_runs(
        &self,
        project: &str,
        pipeline_id: i64,
    ) -> Result<Vec<PipelineRunRecord>>;
}

// =============================================================================
// PROJECT REPOSITORY
// =============================================================================

/// Request for creating a project record directly.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub process_template: Option<String>,
    pub source_control: Option<String>,
    pub visibility: Option<String>,
}

/// Repository for project CRUD operations.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a new project.
    async fn insert(&self, req: CreateProjectRequest) -> Result<Uuid>;

    /// Fetch a project by id.
    async fn get(&self, id: Uuid) -> Result<Project>;

    /// List all projects ordered by name.
    async fn list(&self) -> Result<Vec<Project>>;

    /// Check if a project exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Insert or refresh a project from a source listing (keyed by
    /// external id). Returns the local project id.
    async fn upsert_synced(&self, record: &SourceProjectRecord) -> Result<Uuid>;

    /// Update migration status.
    async fn update_status(&self, id: Uuid, status: ProjectStatus) -> Result<()>;

    /// Replace the artifact summary for one kind (whole-object replace, never
    /// a field-level merge) and refresh the project's per-kind counts.
    async fn put_artifact_summary(
        &self,
        id: Uuid,
        kind: ArtifactKind,
        summary: ArtifactSummary,
    ) -> Result<()>;

    /// Dashboard statistics across all projects.
    async fn stats(&self) -> Result<DashboardStats>;
}

// =============================================================================
// EXTRACTION JOB REPOSITORY
// =============================================================================

/// Repository for extraction job records.
///
/// Job history is retained indefinitely; jobs are never deleted, only bounded
/// for display by recency.
#[async_trait]
pub trait ExtractionJobRepository: Send + Sync {
    /// Create a job in `queued` for the pair, atomically enforcing the
    /// at-most-one-active-job invariant. Fails with `Error::Conflict` when a
    /// `queued` or `in_progress` job already exists for the same pair.
    async fn create(&self, project_id: Uuid, kind: ArtifactKind) -> Result<ExtractionJob>;

    /// Fetch a job by id. Pure read, safe to call arbitrarily often.
    async fn get(&self, job_id: Uuid) -> Result<ExtractionJob>;

    /// All jobs for a project, newest first.
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ExtractionJob>>;

    /// The active job for a pair, if any.
    async fn find_active(
        &self,
        project_id: Uuid,
        kind: ArtifactKind,
    ) -> Result<Option<ExtractionJob>>;

    /// Transition `queued -> in_progress`.
    async fn mark_in_progress(&self, job_id: Uuid) -> Result<()>;

    /// Update best-effort progress counters on a non-terminal job.
    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        extracted: i64,
        total: i64,
    ) -> Result<()>;

    /// Transition to `completed`. Rejected with `Error::Conflict` when the
    /// job is already terminal.
    async fn complete(&self, job_id: Uuid, extracted: i64, total: i64) -> Result<()>;

    /// Transition to `failed` with an error message. Rejected with
    /// `Error::Conflict` when the job is already terminal.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;
}

// =============================================================================
// CONNECTION REPOSITORY
// =============================================================================

/// Request for storing a connection.
#[derive(Debug, Clone)]
pub struct CreateConnectionRequest {
    pub name: String,
    pub organization: String,
    pub base_url: String,
    pub token: String,
    pub role: ConnectionRole,
    pub active: bool,
}

/// Repository for stored instance connections.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Insert a connection, or update the existing one for the same
    /// (organization, role) pair.
    async fn upsert(&self, req: CreateConnectionRequest) -> Result<SourceConnection>;

    /// All active connections, newest first.
    async fn list_active(&self) -> Result<Vec<SourceConnection>>;

    /// The most recently created active connection for a role.
    async fn active_for_role(&self, role: ConnectionRole) -> Result<Option<SourceConnection>>;
}
