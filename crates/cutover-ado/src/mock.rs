//! Mock artifact source for deterministic testing.
//!
//! Scripted per-endpoint responses, injected failures, and optional latency,
//! with a call log for assertions. Used by the jobs crate's unit and
//! integration tests instead of a live instance.
//!
//! ## Usage
//!
//! ```ignore
//! let source = MockArtifactSource::new()
//!     .with_work_items(vec![1, 2], records)
//!     .with_failure("repositories", MockFailure::timeout("no route to host"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cutover_core::traits::ArtifactSource;
use cutover_core::{
    BoardColumnRecord, BranchRecord, ClassificationGroup, ClassificationNode, CommitRecord,
    Error, FieldRecord, PipelineRecord, PipelineRunRecord, PullRequestRecord, RepositoryRecord,
    Result, SourceProjectRecord, TestCaseRecord, TestPlanRecord, TestResultRecord,
    TestSuiteRecord, WikiPageRecord, WorkItemRecord, WorkItemTypeRecord,
};

/// A failure scripted for one endpoint.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Timeout(String),
    Auth(String),
    Malformed(String),
    Request(String),
}

impl MockFailure {
    pub fn timeout(msg: impl Into<String>) -> Self {
        MockFailure::Timeout(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        MockFailure::Auth(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        MockFailure::Malformed(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        MockFailure::Request(msg.into())
    }

    fn to_error(&self) -> Error {
        match self {
            MockFailure::Timeout(msg) => Error::UpstreamTimeout(msg.clone()),
            MockFailure::Auth(msg) => Error::UpstreamAuth(msg.clone()),
            MockFailure::Malformed(msg) => Error::UpstreamMalformed(msg.clone()),
            MockFailure::Request(msg) => Error::Request(msg.clone()),
        }
    }
}

/// Scripted response data, keyed the way the real endpoints are.
#[derive(Debug, Clone, Default)]
struct MockData {
    projects: Vec<SourceProjectRecord>,
    area_paths: Vec<ClassificationNode>,
    iteration_paths: Vec<ClassificationNode>,
    work_item_types: Vec<WorkItemTypeRecord>,
    fields: Vec<FieldRecord>,
    board_columns: Vec<BoardColumnRecord>,
    wiki_pages: Vec<WikiPageRecord>,
    work_item_ids: Vec<i64>,
    work_items: Vec<WorkItemRecord>,
    repositories: Vec<RepositoryRecord>,
    branches: HashMap<String, Vec<BranchRecord>>,
    commits: HashMap<String, Vec<CommitRecord>>,
    pull_requests: HashMap<String, Vec<PullRequestRecord>>,
    test_plans: Vec<TestPlanRecord>,
    test_suites: HashMap<i64, Vec<TestSuiteRecord>>,
    test_cases: HashMap<i64, Vec<TestCaseRecord>>,
    test_results: Vec<TestResultRecord>,
    build_pipelines: Vec<PipelineRecord>,
    release_pipelines: Vec<PipelineRecord>,
    pipeline_runs: HashMap<i64, Vec<PipelineRunRecord>>,
}

/// Mock implementation of [`ArtifactSource`] for tests.
#[derive(Clone, Default)]
pub struct MockArtifactSource {
    data: MockData,
    failures: HashMap<String, MockFailure>,
    latency: Option<Duration>,
    call_log: Arc<Mutex<Vec<String>>>,
}

impl MockArtifactSource {
    /// Create an empty mock; every endpoint returns an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(mut self, projects: Vec<SourceProjectRecord>) -> Self {
        self.data.projects = projects;
        self
    }

    pub fn with_area_paths(mut self, nodes: Vec<ClassificationNode>) -> Self {
        self.data.area_paths = nodes;
        self
    }

    pub fn with_iteration_paths(mut self, nodes: Vec<ClassificationNode>) -> Self {
        self.data.iteration_paths = nodes;
        self
    }

    pub fn with_work_item_types(mut self, types: Vec<WorkItemTypeRecord>) -> Self {
        self.data.work_item_types = types;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldRecord>) -> Self {
        self.data.fields = fields;
        self
    }

    pub fn with_board_columns(mut self, columns: Vec<BoardColumnRecord>) -> Self {
        self.data.board_columns = columns;
        self
    }

    pub fn with_wiki_pages(mut self, pages: Vec<WikiPageRecord>) -> Self {
        self.data.wiki_pages = pages;
        self
    }

    /// Script the two-step work item flow: the id query and the batch records.
    pub fn with_work_items(mut self, ids: Vec<i64>, records: Vec<WorkItemRecord>) -> Self {
        self.data.work_item_ids = ids;
        self.data.work_items = records;
        self
    }

    pub fn with_repositories(mut self, repos: Vec<RepositoryRecord>) -> Self {
        self.data.repositories = repos;
        self
    }

    pub fn with_branches(mut self, repo_id: &str, branches: Vec<BranchRecord>) -> Self {
        self.data.branches.insert(repo_id.to_string(), branches);
        self
    }

    pub fn with_commits(mut self, repo_id: &str, commits: Vec<CommitRecord>) -> Self {
        self.data.commits.insert(repo_id.to_string(), commits);
        self
    }

    pub fn with_pull_requests(mut self, repo_id: &str, prs: Vec<PullRequestRecord>) -> Self {
        self.data.pull_requests.insert(repo_id.to_string(), prs);
        self
    }

    pub fn with_test_plans(mut self, plans: Vec<TestPlanRecord>) -> Self {
        self.data.test_plans = plans;
        self
    }

    pub fn with_test_suites(mut self, plan_id: i64, suites: Vec<TestSuiteRecord>) -> Self {
        self.data.test_suites.insert(plan_id, suites);
        self
    }

    pub fn with_test_cases(mut self, suite_id: i64, cases: Vec<TestCaseRecord>) -> Self {
        self.data.test_cases.insert(suite_id, cases);
        self
    }

    pub fn with_test_results(mut self, results: Vec<TestResultRecord>) -> Self {
        self.data.test_results = results;
        self
    }

    pub fn with_build_pipelines(mut self, pipelines: Vec<PipelineRecord>) -> Self {
        self.data.build_pipelines = pipelines;
        self
    }

    pub fn with_release_pipelines(mut self, pipelines: Vec<PipelineRecord>) -> Self {
        self.data.release_pipelines = pipelines;
        self
    }

    pub fn with_pipeline_runs(mut self, pipeline_id: i64, runs: Vec<PipelineRunRecord>) -> Self {
        self.data.pipeline_runs.insert(pipeline_id, runs);
        self
    }

    /// Script a failure for one endpoint (by operation name, e.g.
    /// `"repositories"`, `"work_item_ids"`).
    pub fn with_failure(mut self, op: &str, failure: MockFailure) -> Self {
        self.failures.insert(op.to_string(), failure);
        self
    }

    /// Delay every call by the given duration.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    /// How many times one operation was invoked.
    pub fn call_count(&self, op: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    async fn enter(&self, op: &str) -> Result<()> {
        self.call_log.lock().unwrap().push(op.to_string());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(failure) = self.failures.get(op) {
            return Err(failure.to_error());
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactSource for MockArtifactSource {
    async fn projects(&self) -> Result<Vec<SourceProjectRecord>> {
        self.enter("projects").await?;
        Ok(self.data.projects.clone())
    }

    async fn test_connection(&self) -> Result<bool> {
        self.enter("test_connection").await?;
        Ok(true)
    }

    async fn classification_nodes(
        &self,
        _project: &str,
        group: ClassificationGroup,
    ) -> Result<Vec<ClassificationNode>> {
        match group {
            ClassificationGroup::Areas => {
                self.enter("area_paths").await?;
                Ok(self.data.area_paths.clone())
            }
            ClassificationGroup::Iterations => {
                self.enter("iteration_paths").await?;
                Ok(self.data.iteration_paths.clone())
            }
        }
    }

    async fn work_item_types(&self, _project: &str) -> Result<Vec<WorkItemTypeRecord>> {
        self.enter("work_item_types").await?;
        Ok(self.data.work_item_types.clone())
    }

    async fn fields(&self, _project: &str) -> Result<Vec<FieldRecord>> {
        self.enter("fields").await?;
        Ok(self.data.fields.clone())
    }

    async fn board_columns(&self, _project: &str) -> Result<Vec<BoardColumnRecord>> {
        self.enter("board_columns").await?;
        Ok(self.data.board_columns.clone())
    }

    async fn wiki_pages(&self, _project: &str) -> Result<Vec<WikiPageRecord>> {
        self.enter("wiki_pages").await?;
        Ok(self.data.wiki_pages.clone())
    }

    async fn work_item_ids(&self, _project: &str, cap: usize) -> Result<Vec<i64>> {
        self.enter("work_item_ids").await?;
        let mut ids = self.data.work_item_ids.clone();
        ids.sort_unstable();
        ids.truncate(cap);
        Ok(ids)
    }

    async fn work_items(&self, _project: &str, ids: &[i64]) -> Result<Vec<WorkItemRecord>> {
        self.enter("work_items").await?;
        Ok(self
            .data
            .work_items
            .iter()
            .filter(|w| ids.contains(&w.id))
            .cloned()
            .collect())
    }

    async fn repositories(&self, _project: &str) -> Result<Vec<RepositoryRecord>> {
        self.enter("repositories").await?;
        Ok(self.data.repositories.clone())
    }

    async fn branches(&self, _project: &str, repo_id: &str) -> Result<Vec<BranchRecord>> {
        self.enter("branches").await?;
        Ok(self.data.branches.get(repo_id).cloned().unwrap_or_default())
    }

    async fn commits(
        &self,
        _project: &str,
        repo_id: &str,
        top: usize,
    ) -> Result<Vec<CommitRecord>> {
        self.enter("commits").await?;
        let mut commits = self.data.commits.get(repo_id).cloned().unwrap_or_default();
        commits.truncate(top);
        Ok(commits)
    }

    async fn pull_requests(
        &self,
        _project: &str,
        repo_id: &str,
        top: usize,
    ) -> Result<Vec<PullRequestRecord>> {
        self.enter("pull_requests").await?;
        let mut prs = self
            .data
            .pull_requests
            .get(repo_id)
            .cloned()
            .unwrap_or_default();
        prs.truncate(top);
        Ok(prs)
    }

    async fn test_plans(&self, _project: &str) -> Result<Vec<TestPlanRecord>> {
        self.enter("test_plans").await?;
        Ok(self.data.test_plans.clone())
    }

    async fn test_suites(&self, _project: &str, plan_id: i64) -> Result<Vec<TestSuiteRecord>> {
        self.enter("test_suites").await?;
        Ok(self
            .data
            .test_suites
            .get(&plan_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn test_cases(
        &self,
        _project: &str,
        _plan_id: i64,
        suite_id: i64,
    ) -> Result<Vec<TestCaseRecord>> {
        self.enter("test_cases").await?;
        Ok(self
            .data
            .test_cases
            .get(&suite_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn test_results(&self, _project: &str) -> Result<Vec<TestResultRecord>> {
        self.enter("test_results").await?;
        Ok(self.data.test_results.clone())
    }

    async fn build_pipelines(&self, _project: &str) -> Result<Vec<PipelineRecord>> {
        self.enter("build_pipelines").await?;
        Ok(self.data.build_pipelines.clone())
    }

    async fn release_pipelines(&self, _project: &str) -> Result<Vec<PipelineRecord>> {
        self.enter("release_pipelines").await?;
        Ok(self.data.release_pipelines.clone())
    }

    async fn pipeline_runs(
        &self,
        _project: &str,
        pipeline_id: i64,
    ) -> Result<Vec<PipelineRunRecord>> {
        self.enter("pipeline_runs").await?;
        Ok(self
            .data
            .pipeline_runs
            .get(&pipeline_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_scripted_work_items() {
        let source = MockArtifactSource::new().with_work_items(
            vec![2, 1],
            vec![
                WorkItemRecord {
                    id: 1,
                    fields: serde_json::json!({"System.Title": "one"}),
                },
                WorkItemRecord {
                    id: 2,
                    fields: serde_json::json!({"System.Title": "two"}),
                },
            ],
        );

        let ids = source.work_item_ids("p", 10).await.unwrap();
        assert_eq!(ids, vec![1, 2]);

        let items = source.work_items("p", &ids).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_id_query_respects_cap() {
        let source = MockArtifactSource::new().with_work_items((1..=500).collect(), vec![]);
        let ids = source.work_item_ids("p", 200).await.unwrap();
        assert_eq!(ids.len(), 200);
        assert_eq!(ids[0], 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let source = MockArtifactSource::new()
            .with_failure("repositories", MockFailure::timeout("no route to host"));

        let err = source.repositories("p").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamTimeout(_)));
        assert!(err.to_string().to_lowercase().contains("timeout"));

        // Other endpoints are unaffected.
        assert!(source.work_item_types("p").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_call_log() {
        let source = MockArtifactSource::new();
        source.test_plans("p").await.unwrap();
        source.test_plans("p").await.unwrap();
        source.repositories("p").await.unwrap();

        assert_eq!(source.call_count("test_plans"), 2);
        assert_eq!(source.call_count("repositories"), 1);
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_commit_bound() {
        let commits: Vec<CommitRecord> = (0..50)
            .map(|i| CommitRecord {
                commit_id: format!("c{}", i),
                author: "a".into(),
                committer: "a".into(),
                comment: String::new(),
                commit_date: None,
            })
            .collect();
        let source = MockArtifactSource::new().with_commits("r1", commits);
        let bounded = source.commits("p", "r1", 25).await.unwrap();
        assert_eq!(bounded.len(), 25);
    }
}
