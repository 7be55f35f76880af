//! Azure DevOps REST client implementing the `ArtifactSource` capability.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use cutover_core::{
    defaults, BoardColumnRecord, BranchRecord, ClassificationGroup, ClassificationNode,
    CommitRecord, Error, FieldRecord, PipelineRecord, PipelineRunRecord, PullRequestRecord,
    RepositoryRecord, Result, SourceConnection, SourceProjectRecord, TestCaseRecord,
    TestPlanRecord, TestResultRecord, TestSuiteRecord, WikiPageRecord, WorkItemRecord,
    WorkItemTypeRecord,
};
use cutover_core::traits::ArtifactSource;

use crate::wire::*;

/// Default host for organization URLs.
pub const DEFAULT_HOST: &str = "https://dev.azure.com";

/// Depth requested for classification tree reads.
const CLASSIFICATION_DEPTH: u32 = 10;

/// Test runs inspected when collecting recent test results.
const TEST_RESULT_RUNS: usize = 10;

/// Azure DevOps REST client.
///
/// One instance per connection; cheap to clone. Every call is a suspension
/// point with its own timeout, and failures map onto the `Upstream*` error
/// variants rather than leaking transport errors.
#[derive(Clone)]
pub struct AdoClient {
    client: Client,
    base_url: String,
    auth_header: String,
}

impl AdoClient {
    /// Create a client for an organization using a personal access token.
    pub fn new(organization: &str, pat: &str) -> Self {
        Self::with_base_url(format!("{}/{}", DEFAULT_HOST, organization), pat)
    }

    /// Create a client against an explicit base URL (self-hosted instances,
    /// tests).
    pub fn with_base_url(base_url: impl Into<String>, pat: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{}", pat));
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::SOURCE_REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: format!("Basic {}", encoded),
        }
    }

    /// Create a client from a stored connection.
    pub fn from_connection(conn: &SourceConnection) -> Self {
        Self::with_base_url(conn.base_url.clone(), &conn.token)
    }

    /// The base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let sep = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}/{}{}api-version={}",
            self.base_url, path, sep, defaults::SOURCE_API_VERSION
        )
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::UpstreamAuth(format!(
                "source returned {} for {}",
                status, url
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "source returned {} for {}: {}",
                status, url, body
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::UpstreamMalformed(format!("decoding {}: {}", url, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(Error::from)?;
        let result = Self::decode(response, &url).await;
        debug!(
            op = "get",
            duration_ms = start.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "{}", path
        );
        result
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .json(body)
            .send()
            .await
            .map_err(Error::from)?;
        let result = Self::decode(response, &url).await;
        debug!(
            op = "post",
            duration_ms = start.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "{}", path
        );
        result
    }
}

#[async_trait]
impl ArtifactSource for AdoClient {
    async fn projects(&self) -> Result<Vec<SourceProjectRecord>> {
        let listing: ListEnvelope<WireProject> = self.get_json("_apis/projects").await?;

        // Capability details are best-effort per project; a failed detail
        // read degrades to the basic listing record.
        let mut records = Vec::with_capacity(listing.value.len());
        for project in listing.value {
            let detail: Option<WireProjectDetail> = match self
                .get_json(&format!(
                    "_apis/projects/{}?includeCapabilities=true",
                    project.id
                ))
                .await
            {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!(error = %e, "Failed to read capabilities for project {}", project.name);
                    None
                }
            };
            records.push(project.into_record(detail));
        }
        Ok(records)
    }

    async fn test_connection(&self) -> Result<bool> {
        match self
            .get_json::<ListEnvelope<WireProject>>("_apis/projects")
            .await
        {
            Ok(_) => Ok(true),
            Err(Error::UpstreamAuth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn classification_nodes(
        &self,
        project: &str,
        group: ClassificationGroup,
    ) -> Result<Vec<ClassificationNode>> {
        let root: WireClassificationNode = self
            .get_json(&format!(
                "{}/_apis/wit/classificationnodes/{}?$depth={}",
                project,
                group.path_segment(),
                CLASSIFICATION_DEPTH
            ))
            .await?;
        let mut nodes = Vec::new();
        root.flatten(&mut nodes);
        Ok(nodes)
    }

    async fn work_item_types(&self, project: &str) -> Result<Vec<WorkItemTypeRecord>> {
        let listing: ListEnvelope<WireWorkItemType> = self
            .get_json(&format!("{}/_apis/wit/workitemtypes", project))
            .await?;
        Ok(listing.value.into_iter().map(|t| t.into_record()).collect())
    }

    async fn fields(&self, project: &str) -> Result<Vec<FieldRecord>> {
        let listing: ListEnvelope<WireField> = self
            .get_json(&format!("{}/_apis/wit/fields", project))
            .await?;
        Ok(listing.value.into_iter().map(|f| f.into_record()).collect())
    }

    async fn board_columns(&self, project: &str) -> Result<Vec<BoardColumnRecord>> {
        let teams: ListEnvelope<WireTeam> = self
            .get_json(&format!("_apis/projects/{}/teams", project))
            .await?;

        let mut columns = Vec::new();
        for team in &teams.value {
            // Board access varies per team; skip teams we cannot read.
            let boards: ListEnvelope<WireBoard> = match self
                .get_json(&format!("{}/{}/_apis/work/boards", project, team.id))
                .await
            {
                Ok(boards) => boards,
                Err(e) => {
                    warn!(error = %e, "Failed to list boards for team {}", team.name);
                    continue;
                }
            };
            for board in &boards.value {
                let board_columns: ListEnvelope<WireBoardColumn> = match self
                    .get_json(&format!(
                        "{}/{}/_apis/work/boards/{}/columns",
                        project, team.id, board.id
                    ))
                    .await
                {
                    Ok(cols) => cols,
                    Err(e) => {
                        warn!(error = %e, "Failed to list columns for board {}", board.name);
                        continue;
                    }
                };
                columns.extend(
                    board_columns
                        .value
                        .into_iter()
                        .map(|c| c.into_record(board, team)),
                );
            }
        }
        Ok(columns)
    }

    async fn wiki_pages(&self, project: &str) -> Result<Vec<WikiPageRecord>> {
        let wikis: ListEnvelope<WireWiki> = self
            .get_json(&format!("{}/_apis/wiki/wikis", project))
            .await?;

        let mut pages = Vec::new();
        for wiki in &wikis.value {
            let root: WireWikiPage = match self
                .get_json(&format!(
                    "{}/_apis/wiki/wikis/{}/pages?path=/&recursionLevel=full",
                    project, wiki.id
                ))
                .await
            {
                Ok(root) => root,
                Err(e) => {
                    warn!(error = %e, "Failed to read pages of wiki {}", wiki.name);
                    continue;
                }
            };
            root.flatten(wiki, &mut pages);
        }
        Ok(pages)
    }

    async fn work_item_ids(&self, project: &str, cap: usize) -> Result<Vec<i64>> {
        let query = serde_json::json!({
            "query": "SELECT [System.Id] FROM WorkItems \
                      WHERE [System.TeamProject] = @project \
                      ORDER BY [System.Id] ASC"
        });
        let response: WireWiqlResponse = self
            .post_json(&format!("{}/_apis/wit/wiql?$top={}", project, cap), &query)
            .await?;
        let mut ids: Vec<i64> = response.work_items.into_iter().map(|r| r.id).collect();
        ids.truncate(cap);
        Ok(ids)
    }

    async fn work_items(&self, project: &str, ids: &[i64]) -> Result<Vec<WorkItemRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(defaults::WORK_ITEM_BATCH) {
            let ids_param = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let listing: ListEnvelope<WireWorkItem> = self
                .get_json(&format!(
                    "{}/_apis/wit/workitems?ids={}&$expand=all",
                    project, ids_param
                ))
                .await?;
            records.extend(listing.value.into_iter().map(|w| w.into_record()));
        }
        Ok(records)
    }

    async fn repositories(&self, project: &str) -> Result<Vec<RepositoryRecord>> {
        let listing: ListEnvelope<WireRepository> = self
            .get_json(&format!("{}/_apis/git/repositories", project))
            .await?;
        Ok(listing.value.into_iter().map(|r| r.into_record()).collect())
    }

    async fn branches(&self, project: &str, repo_id: &str) -> Result<Vec<BranchRecord>> {
        let listing: ListEnvelope<WireRef> = self
            .get_json(&format!(
                "{}/_apis/git/repositories/{}/refs?filter=heads/",
                project, repo_id
            ))
            .await?;
        Ok(listing.value.into_iter().map(|r| r.into_record()).collect())
    }

    async fn commits(
        &self,
        project: &str,
        repo_id: &str,
        top: usize,
    ) -> Result<Vec<CommitRecord>> {
        let listing: ListEnvelope<WireCommit> = self
            .get_json(&format!(
                "{}/_apis/git/repositories/{}/commits?$top={}",
                project, repo_id, top
            ))
            .await?;
        Ok(listing.value.into_iter().map(|c| c.into_record()).collect())
    }

    async fn pull_requests(
        &self,
        project: &str,
        repo_id: &str,
        top: usize,
    ) -> Result<Vec<PullRequestRecord>> {
        let listing: ListEnvelope<WirePullRequest> = self
            .get_json(&format!(
                "{}/_apis/git/repositories/{}/pullrequests?$top={}",
                project, repo_id, top
            ))
            .await?;
        Ok(listing.value.into_iter().map(|p| p.into_record()).collect())
    }

    async fn test_plans(&self, project: &str) -> Result<Vec<TestPlanRecord>> {
        let listing: ListEnvelope<WireTestPlan> = self
            .get_json(&format!("{}/_apis/test/plans", project))
            .await?;
        Ok(listing.value.into_iter().map(|p| p.into_record()).collect())
    }

    async fn test_suites(&self, project: &str, plan_id: i64) -> Result<Vec<TestSuiteRecord>> {
        let listing: ListEnvelope<WireTestSuite> = self
            .get_json(&format!("{}/_apis/test/plans/{}/suites", project, plan_id))
            .await?;
        Ok(listing
            .value
            .into_iter()
            .map(|s| s.into_record(plan_id))
            .collect())
    }

    async fn test_cases(
        &self,
        project: &str,
        plan_id: i64,
        suite_id: i64,
    ) -> Result<Vec<TestCaseRecord>> {
        let listing: ListEnvelope<WireSuiteEntry> = self
            .get_json(&format!(
                "{}/_apis/test/plans/{}/suites/{}/testcases",
                project, plan_id, suite_id
            ))
            .await?;
        Ok(listing
            .value
            .into_iter()
            .map(|entry| TestCaseRecord {
                id: entry.test_case.id.parse().unwrap_or(0),
                title: entry.test_case.name.unwrap_or_default(),
                state: String::new(),
                priority: 0,
            })
            .collect())
    }

    async fn test_results(&self, project: &str) -> Result<Vec<TestResultRecord>> {
        let runs: ListEnvelope<WireTestRun> = self
            .get_json(&format!("{}/_apis/test/runs", project))
            .await?;

        let mut results = Vec::new();
        for run in runs.value.iter().rev().take(TEST_RESULT_RUNS) {
            let run_name = run.name.clone().unwrap_or_default();
            let run_results: ListEnvelope<WireTestResult> = match self
                .get_json(&format!("{}/_apis/test/Runs/{}/results", project, run.id))
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "Failed to read results of test run {}", run.id);
                    continue;
                }
            };
            results.extend(run_results.value.into_iter().map(|r| TestResultRecord {
                id: r.id,
                test_case_title: r.test_case_title.unwrap_or_default(),
                outcome: r.outcome.unwrap_or_default(),
                run_name: run_name.clone(),
            }));
        }
        Ok(results)
    }

    async fn build_pipelines(&self, project: &str) -> Result<Vec<PipelineRecord>> {
        let listing: ListEnvelope<WirePipeline> = self
            .get_json(&format!("{}/_apis/pipelines", project))
            .await?;
        Ok(listing.value.into_iter().map(|p| p.into_record()).collect())
    }

    async fn release_pipelines(&self, project: &str) -> Result<Vec<PipelineRecord>> {
        let listing: ListEnvelope<WireReleaseDefinition> = self
            .get_json(&format!("{}/_apis/release/definitions", project))
            .await?;
        Ok(listing.value.into_iter().map(|d| d.into_record()).collect())
    }

    async fn pipeline_runs(
        &self,
        project: &str,
        pipeline_id: i64,
    ) -> Result<Vec<PipelineRunRecord>> {
        let listing: ListEnvelope<WirePipelineRun> = self
            .get_json(&format!("{}/_apis/pipelines/{}/runs", project, pipeline_id))
            .await?;
        Ok(listing
            .value
            .into_iter()
            .map(|r| r.into_record(pipeline_id))
            .collect())
    }
}
