//! Wire-format models for the Azure DevOps REST API.
//!
//! These mirror the JSON the service actually returns (camelCase, optional
//! almost everywhere) and convert into the normalized records from
//! `cutover-core`. Nothing outside this crate sees these shapes.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use cutover_core::{
    BoardColumnRecord, BranchRecord, ClassificationNode, CommitRecord, FieldRecord,
    PipelineRecord, PipelineRunRecord, PullRequestRecord, RepositoryRecord, SourceProjectRecord,
    TestPlanRecord, TestSuiteRecord, WikiPageRecord, WorkItemRecord, WorkItemTypeRecord,
};

/// Standard `{ count, value }` list envelope.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default)]
    #[allow(dead_code)]
    pub count: Option<i64>,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

// =============================================================================
// PROJECTS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireProjectCapabilities {
    #[serde(default)]
    pub process_template: Option<WireProcessTemplate>,
    #[serde(default)]
    pub versioncontrol: Option<WireVersionControl>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProcessTemplate {
    #[serde(default)]
    pub template_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVersionControl {
    #[serde(default)]
    pub source_control_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProjectDetail {
    #[serde(default)]
    pub capabilities: Option<WireProjectCapabilities>,
}

impl WireProject {
    pub fn into_record(self, detail: Option<WireProjectDetail>) -> SourceProjectRecord {
        let caps = detail.and_then(|d| d.capabilities).unwrap_or_default();
        SourceProjectRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            visibility: self.visibility,
            state: self.state,
            process_template: caps
                .process_template
                .and_then(|t| t.template_name),
            source_control: caps
                .versioncontrol
                .and_then(|v| v.source_control_type),
            last_update_time: self.last_update_time,
        }
    }
}

// =============================================================================
// CLASSIFICATION NODES
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireClassificationAttributes {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireClassificationNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub has_children: Option<bool>,
    #[serde(default)]
    pub attributes: Option<WireClassificationAttributes>,
    #[serde(default = "Vec::new")]
    pub children: Vec<WireClassificationNode>,
}

impl WireClassificationNode {
    /// Depth-first flatten of the node tree into ordered records.
    pub fn flatten(self, out: &mut Vec<ClassificationNode>) {
        let attributes = self.attributes.unwrap_or_default();
        out.push(ClassificationNode {
            id: self.id.to_string(),
            name: self.name.clone(),
            path: self.path.unwrap_or_else(|| format!("\\{}", self.name)),
            has_children: self.has_children.unwrap_or(!self.children.is_empty()),
            start_date: attributes.start_date,
            end_date: attributes.finish_date,
        });
        for child in self.children {
            child.flatten(out);
        }
    }
}

// =============================================================================
// WORK ITEM TRACKING
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireWorkItemType {
    pub name: String,
    pub reference_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl WireWorkItemType {
    pub fn into_record(self) -> WorkItemTypeRecord {
        WorkItemTypeRecord {
            name: self.name,
            reference_name: self.reference_name,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireField {
    pub name: String,
    pub reference_name: String,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub read_only: Option<bool>,
}

impl WireField {
    pub fn into_record(self) -> FieldRecord {
        FieldRecord {
            name: self.name,
            reference_name: self.reference_name,
            field_type: self.field_type.unwrap_or_else(|| "string".to_string()),
            read_only: self.read_only.unwrap_or(false),
        }
    }
}

/// WIQL response: flat references, ids only.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireWiqlResponse {
    #[serde(default = "Vec::new")]
    pub work_items: Vec<WireWorkItemRef>,
}

#[derive(Debug, Deserialize)]
pub struct WireWorkItemRef {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct WireWorkItem {
    pub id: i64,
    #[serde(default)]
    pub fields: serde_json::Value,
}

impl WireWorkItem {
    pub fn into_record(self) -> WorkItemRecord {
        WorkItemRecord {
            id: self.id,
            fields: self.fields,
        }
    }
}

// =============================================================================
// TEAMS / BOARDS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WireTeam {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WireBoard {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBoardColumn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_type: Option<String>,
    #[serde(default)]
    pub item_limit: Option<i64>,
}

impl WireBoardColumn {
    pub fn into_record(self, board: &WireBoard, team: &WireTeam) -> BoardColumnRecord {
        BoardColumnRecord {
            id: self.id,
            name: self.name,
            column_type: self.column_type.unwrap_or_default(),
            item_limit: self.item_limit.unwrap_or(0),
            board: board.name.clone(),
            team: team.name.clone(),
        }
    }
}

// =============================================================================
// WIKI
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WireWiki {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireWikiPage {
    #[serde(default)]
    pub id: Option<i64>,
    pub path: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "Vec::new")]
    pub sub_pages: Vec<WireWikiPage>,
}

impl WireWikiPage {
    /// Depth-first flatten of the page tree.
    pub fn flatten(self, wiki: &WireWiki, out: &mut Vec<WikiPageRecord>) {
        out.push(WikiPageRecord {
            id: self.id.map(|i| i.to_string()).unwrap_or_default(),
            path: self.path.clone(),
            wiki: wiki.name.clone(),
            url: self.url,
        });
        for page in self.sub_pages {
            page.flatten(wiki, out);
        }
    }
}

// =============================================================================
// GIT
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

impl WireRepository {
    pub fn into_record(self) -> RepositoryRecord {
        RepositoryRecord {
            id: self.id,
            name: self.name,
            web_url: self.web_url.unwrap_or_default(),
            default_branch: self.default_branch,
            size: self.size.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRef {
    pub name: String,
    #[serde(default)]
    pub object_id: Option<String>,
}

impl WireRef {
    pub fn into_record(self) -> BranchRecord {
        BranchRecord {
            name: self
                .name
                .strip_prefix("refs/heads/")
                .unwrap_or(&self.name)
                .to_string(),
            object_id: self.object_id.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct WireGitUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCommit {
    pub commit_id: String,
    #[serde(default)]
    pub author: Option<WireGitUser>,
    #[serde(default)]
    pub committer: Option<WireGitUser>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl WireCommit {
    pub fn into_record(self) -> CommitRecord {
        let author = self.author.unwrap_or_default();
        let committer = self.committer.unwrap_or_default();
        CommitRecord {
            commit_id: self.commit_id,
            author: author.name.unwrap_or_default(),
            committer: committer.name.unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
            commit_date: author.date,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireIdentity {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePullRequest {
    pub pull_request_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_by: Option<WireIdentity>,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_ref_name: Option<String>,
    #[serde(default)]
    pub target_ref_name: Option<String>,
}

impl WirePullRequest {
    pub fn into_record(self) -> PullRequestRecord {
        PullRequestRecord {
            id: self.pull_request_id,
            title: self.title.unwrap_or_default(),
            created_by: self
                .created_by
                .unwrap_or_default()
                .display_name
                .unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            source_branch: self.source_ref_name.unwrap_or_default(),
            target_branch: self.target_ref_name.unwrap_or_default(),
            created_date: self.creation_date,
        }
    }
}

// =============================================================================
// TEST MANAGEMENT
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTestPlan {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub area_path: Option<String>,
    #[serde(default)]
    pub iteration: Option<String>,
}

impl WireTestPlan {
    pub fn into_record(self) -> TestPlanRecord {
        TestPlanRecord {
            id: self.id,
            name: self.name,
            state: self.state.unwrap_or_default(),
            area_path: self.area_path,
            iteration: self.iteration,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTestSuite {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub suite_type: Option<String>,
}

impl WireTestSuite {
    pub fn into_record(self, plan_id: i64) -> TestSuiteRecord {
        TestSuiteRecord {
            id: self.id,
            plan_id,
            name: self.name,
            suite_type: self.suite_type.unwrap_or_default(),
        }
    }
}

/// Suite test case entries nest the case reference under `testCase`, with
/// string ids.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSuiteEntry {
    pub test_case: WireTestCaseRef,
}

#[derive(Debug, Deserialize)]
pub struct WireTestCaseRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireTestRun {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTestResult {
    pub id: i64,
    #[serde(default)]
    pub test_case_title: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

// =============================================================================
// PIPELINES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePipelineConfiguration {
    #[serde(default, rename = "type")]
    pub configuration_type: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePipeline {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub configuration: Option<WirePipelineConfiguration>,
}

impl WirePipeline {
    pub fn into_record(self) -> PipelineRecord {
        let configuration = self.configuration;
        PipelineRecord {
            id: self.id,
            name: self.name,
            folder: self.folder,
            configuration_type: configuration
                .as_ref()
                .and_then(|c| c.configuration_type.clone())
                .unwrap_or_else(|| "yaml".to_string()),
            yaml_path: configuration.and_then(|c| c.path),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReleaseDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl WireReleaseDefinition {
    pub fn into_record(self) -> PipelineRecord {
        PipelineRecord {
            id: self.id,
            name: self.name,
            folder: self.path,
            configuration_type: "designer".to_string(),
            yaml_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePipelineRun {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_date: Option<DateTime<Utc>>,
}

impl WirePipelineRun {
    pub fn into_record(self, pipeline_id: i64) -> PipelineRunRecord {
        PipelineRunRecord {
            id: self.id,
            pipeline_id,
            name: self.name.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            result: self.result,
            created_date: self.created_date,
            finished_date: self.finished_date,
        }
    }
}
