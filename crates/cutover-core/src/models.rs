//! Core data models for cutover.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// ARTIFACT KINDS
// =============================================================================

/// One category of extractable project data.
///
/// The serialized tags are the wire names used by the extraction API and the
/// dashboard (`workitems`, `areapaths`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Area path classification tree
    AreaPaths,
    /// Iteration/sprint classification tree
    IterationPaths,
    /// Work item type definitions (Bug, Task, ...)
    WorkItemTypes,
    /// Custom work item field definitions
    CustomFields,
    /// Kanban board columns across all teams
    BoardColumns,
    /// Wiki pages
    WikiPages,
    /// Work items (two-step query + batch expansion)
    WorkItems,
    /// Git repositories
    Repositories,
    /// Test plans
    TestPlans,
    /// Test suites
    TestSuites,
    /// Test cases
    TestCases,
    /// Test results
    TestResults,
    /// Build pipeline definitions
    BuildPipelines,
    /// Release pipeline definitions
    ReleasePipelines,
    /// Pipeline runs
    PipelineRuns,
}

impl ArtifactKind {
    /// Every extractable kind, in dashboard display order.
    pub fn all() -> [ArtifactKind; 15] {
        [
            ArtifactKind::AreaPaths,
            ArtifactKind::IterationPaths,
            ArtifactKind::WorkItemTypes,
            ArtifactKind::CustomFields,
            ArtifactKind::BoardColumns,
            ArtifactKind::WikiPages,
            ArtifactKind::WorkItems,
            ArtifactKind::Repositories,
            ArtifactKind::TestPlans,
            ArtifactKind::TestSuites,
            ArtifactKind::TestCases,
            ArtifactKind::TestResults,
            ArtifactKind::BuildPipelines,
            ArtifactKind::ReleasePipelines,
            ArtifactKind::PipelineRuns,
        ]
    }

    /// The wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::AreaPaths => "areapaths",
            ArtifactKind::IterationPaths => "iterationpaths",
            ArtifactKind::WorkItemTypes => "workitemtypes",
            ArtifactKind::CustomFields => "customfields",
            ArtifactKind::BoardColumns => "boardcolumns",
            ArtifactKind::WikiPages => "wikipages",
            ArtifactKind::WorkItems => "workitems",
            ArtifactKind::Repositories => "repositories",
            ArtifactKind::TestPlans => "testplans",
            ArtifactKind::TestSuites => "testsuites",
            ArtifactKind::TestCases => "testcases",
            ArtifactKind::TestResults => "testresults",
            ArtifactKind::BuildPipelines => "buildpipelines",
            ArtifactKind::ReleasePipelines => "releasepipelines",
            ArtifactKind::PipelineRuns => "pipelineruns",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKind::all()
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown artifact type: {}", s)))
    }
}

// =============================================================================
// EXTRACTION JOBS
// =============================================================================

/// Status of an extraction job.
///
/// Transitions are monotonic: `queued -> in_progress -> {completed, failed}`.
/// A job never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether this status counts against the at-most-one-active constraint.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// One asynchronous extraction attempt for a (project, artifact kind) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub artifact_kind: ArtifactKind,
    pub status: JobStatus,
    /// Best-effort progress estimate in [0, 100].
    pub progress_percent: i32,
    pub extracted_items: i64,
    /// Best-effort total estimate; 0 when unknown.
    pub total_items: i64,
    pub started_at: DateTime<Utc>,
    /// Set when the job reaches a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when the job failed.
    pub error_message: Option<String>,
}

// =============================================================================
// ARTIFACT SUMMARIES
// =============================================================================

/// Per-artifact-kind extraction result held on a project.
///
/// Invariant: `extracted == true` implies `error` is absent; `error` present
/// implies `extracted == false`. Replaced wholesale on each extraction of the
/// kind, never merged incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub extracted: bool,
    pub count: i64,
    /// Size-bounded preview of the extracted records, not the full payload.
    pub items: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactSummary {
    /// Successful summary. The preview is truncated to
    /// [`defaults::PREVIEW_ITEMS`].
    pub fn ok(count: i64, mut items: Vec<JsonValue>) -> Self {
        items.truncate(defaults::PREVIEW_ITEMS);
        Self {
            extracted: true,
            count,
            items,
            error: None,
        }
    }

    /// Failed summary carrying a human-readable error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            extracted: false,
            count: 0,
            items: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// PROJECTS
// =============================================================================

/// Migration status of a project on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Synced from the source, not yet chosen for migration
    #[default]
    Ready,
    /// Selected for migration
    Selected,
    /// Extraction or migration in flight
    InProgress,
    /// Migration finished
    Migrated,
}

/// A project synced from the source instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// Identifier on the source instance.
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub process_template: Option<String>,
    pub source_control: Option<String>,
    pub visibility: Option<String>,
    pub status: ProjectStatus,
    pub work_item_count: i64,
    pub repo_count: i64,
    pub test_case_count: i64,
    pub pipeline_count: i64,
    /// Latest extraction outcome per artifact kind. Each entry is replaced
    /// wholesale by the aggregator when a job for that kind terminates.
    pub artifact_summaries: HashMap<ArtifactKind, ArtifactSummary>,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Dashboard statistics across all projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_projects: i64,
    pub selected_projects: i64,
    pub in_progress_projects: i64,
    pub migrated_projects: i64,
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Which side of the migration a connection points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionRole {
    #[default]
    Source,
    Target,
}

/// A stored connection to a project-tracking instance.
///
/// Credential validation is delegated to the connection-test call; the token
/// is carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConnection {
    pub id: Uuid,
    pub name: String,
    pub organization: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub role: ConnectionRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SOURCE RECORDS (outbound contract)
// =============================================================================

/// Which classification tree to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationGroup {
    Areas,
    Iterations,
}

impl ClassificationGroup {
    /// URL path segment on the source API.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ClassificationGroup::Areas => "areas",
            ClassificationGroup::Iterations => "iterations",
        }
    }
}

/// One node of an area or iteration tree, flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub id: String,
    pub name: String,
    pub path: String,
    pub has_children: bool,
    /// Iteration start, when the source provides sprint dates.
    pub start_date: Option<DateTime<Utc>>,
    /// Iteration end, when the source provides sprint dates.
    pub end_date: Option<DateTime<Utc>>,
}

/// A work item type definition (Bug, Task, User Story, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemTypeRecord {
    pub name: String,
    pub reference_name: String,
    pub description: Option<String>,
}

/// A work item field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub reference_name: String,
    pub field_type: String,
    pub read_only: bool,
}

/// A board column, tagged with its board and owning team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumnRecord {
    pub id: String,
    pub name: String,
    pub column_type: String,
    pub item_limit: i64,
    pub board: String,
    pub team: String,
}

/// A wiki page path within a project wiki.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiPageRecord {
    pub id: String,
    pub path: String,
    pub wiki: String,
    pub url: Option<String>,
}

/// A fully expanded work item. All system and custom fields ride in `fields`
/// keyed by reference name (`System.Title`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub id: i64,
    pub fields: JsonValue,
}

impl WorkItemRecord {
    fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn title(&self) -> &str {
        self.field_str("System.Title").unwrap_or("")
    }

    pub fn work_item_type(&self) -> &str {
        self.field_str("System.WorkItemType").unwrap_or("")
    }

    pub fn state(&self) -> &str {
        self.field_str("System.State").unwrap_or("")
    }
}

/// A git repository on the source instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: String,
    pub name: String,
    pub web_url: String,
    pub default_branch: Option<String>,
    pub size: i64,
}

/// A branch head within a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub name: String,
    pub object_id: String,
}

/// A commit within a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_id: String,
    pub author: String,
    pub committer: String,
    pub comment: String,
    pub commit_date: Option<DateTime<Utc>>,
}

/// A pull request within a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub id: i64,
    pub title: String,
    pub created_by: String,
    pub status: String,
    pub source_branch: String,
    pub target_branch: String,
    pub created_date: Option<DateTime<Utc>>,
}

/// On-demand repository inspection: branch list plus bounded recent activity.
/// Fetched lazily when a user drills into one repository, never during bulk
/// extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDetail {
    pub repository: RepositoryRecord,
    pub default_branch: Option<String>,
    pub branches: Vec<BranchRecord>,
    pub recent_commits: Vec<CommitRecord>,
    pub recent_pull_requests: Vec<PullRequestRecord>,
}

/// A test plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlanRecord {
    pub id: i64,
    pub name: String,
    pub state: String,
    pub area_path: Option<String>,
    pub iteration: Option<String>,
}

/// A test suite within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteRecord {
    pub id: i64,
    pub plan_id: i64,
    pub name: String,
    pub suite_type: String,
}

/// A test case within a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub id: i64,
    pub title: String,
    pub state: String,
    pub priority: i64,
}

/// A test result from a test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultRecord {
    pub id: i64,
    pub test_case_title: String,
    pub outcome: String,
    pub run_name: String,
}

/// A build or release pipeline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: i64,
    pub name: String,
    pub folder: Option<String>,
    pub configuration_type: String,
    pub yaml_path: Option<String>,
}

/// One run of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunRecord {
    pub id: i64,
    pub pipeline_id: i64,
    pub name: String,
    pub state: String,
    pub result: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub finished_date: Option<DateTime<Utc>>,
}

/// A project as listed by the source instance, used during sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProjectRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub state: Option<String>,
    pub process_template: Option<String>,
    pub source_control: Option<String>,
    pub last_update_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_kind_wire_tags_round_trip() {
        for kind in ArtifactKind::all() {
            let parsed: ArtifactKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_artifact_kind_serde_matches_as_str() {
        for kind in ArtifactKind::all() {
            let tag = serde_json::to_string(&kind).unwrap();
            assert_eq!(tag, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_artifact_kind_unknown_tag_rejected() {
        let err = "boards".parse::<ArtifactKind>().unwrap_err();
        assert!(err.to_string().contains("Unknown artifact type"));
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_status_active_is_inverse_of_terminal() {
        for status in [
            JobStatus::Queued,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.is_active(), !status.is_terminal());
        }
    }

    #[test]
    fn test_job_status_serde_tags() {
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Queued).unwrap(),
            "\"queued\""
        );
    }

    #[test]
    fn test_artifact_summary_ok_invariant() {
        let summary = ArtifactSummary::ok(3, vec![json!({"id": 1})]);
        assert!(summary.extracted);
        assert!(summary.error.is_none());
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_artifact_summary_failed_invariant() {
        let summary = ArtifactSummary::failed("timeout contacting source");
        assert!(!summary.extracted);
        assert_eq!(summary.error.as_deref(), Some("timeout contacting source"));
        assert_eq!(summary.count, 0);
        assert!(summary.items.is_empty());
    }

    #[test]
    fn test_artifact_summary_preview_bounded() {
        let items: Vec<_> = (0..100).map(|i| json!({"id": i})).collect();
        let summary = ArtifactSummary::ok(100, items);
        assert_eq!(summary.count, 100);
        assert_eq!(summary.items.len(), crate::defaults::PREVIEW_ITEMS);
    }

    #[test]
    fn test_work_item_record_field_helpers() {
        let wi = WorkItemRecord {
            id: 7,
            fields: json!({
                "System.Title": "Fix login",
                "System.WorkItemType": "Bug",
                "System.State": "Active"
            }),
        };
        assert_eq!(wi.title(), "Fix login");
        assert_eq!(wi.work_item_type(), "Bug");
        assert_eq!(wi.state(), "Active");
    }

    #[test]
    fn test_work_item_record_missing_fields_empty() {
        let wi = WorkItemRecord {
            id: 7,
            fields: json!({}),
        };
        assert_eq!(wi.title(), "");
        assert_eq!(wi.state(), "");
    }

    #[test]
    fn test_connection_token_not_serialized() {
        let conn = SourceConnection {
            id: Uuid::new_v4(),
            name: "prod".into(),
            organization: "contoso".into(),
            base_url: "https://dev.azure.com/contoso".into(),
            token: "secret-pat".into(),
            role: ConnectionRole::Source,
            active: true,
            created_at: Utc::now(),
        };
        let serialized = serde_json::to_string(&conn).unwrap();
        assert!(!serialized.contains("secret-pat"));
    }

    #[test]
    fn test_classification_group_path_segments() {
        assert_eq!(ClassificationGroup::Areas.path_segment(), "areas");
        assert_eq!(ClassificationGroup::Iterations.path_segment(), "iterations");
    }
}
