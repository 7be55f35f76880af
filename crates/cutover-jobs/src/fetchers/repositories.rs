//! Repository fetcher and on-demand repository inspection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use cutover_core::{
    defaults, ArtifactKind, ArtifactSource, ArtifactSummary, Error, RepositoryDetail, Result,
};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts the repository list for a project.
///
/// Bulk extraction stops at the listing; branches, commits, and pull
/// requests are only read when a user inspects a specific repository (see
/// [`RepositoryInspector`]).
pub struct RepositoriesFetcher;

#[async_trait]
impl ArtifactFetcher for RepositoriesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Repositories
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let repos = ctx.source().repositories(ctx.project_name()).await?;
        let items = repos
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "name": r.name,
                    "url": r.web_url,
                    "defaultBranch": r.default_branch,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(repos.len() as i64, items))
    }
}

/// Lazy per-repository drill-down: branch list, default branch, and bounded
/// recent commits and pull requests.
pub struct RepositoryInspector {
    source: Arc<dyn ArtifactSource>,
}

impl RepositoryInspector {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self { source }
    }

    /// Inspect one repository by id or name.
    pub async fn inspect(&self, project: &str, repo: &str) -> Result<RepositoryDetail> {
        let repos = self.source.repositories(project).await?;
        let repository = repos
            .into_iter()
            .find(|r| r.id == repo || r.name == repo)
            .ok_or_else(|| Error::NotFound(format!("repository {} in project {}", repo, project)))?;

        let branches = self.source.branches(project, &repository.id).await?;
        let recent_commits = self
            .source
            .commits(project, &repository.id, defaults::REPO_PREVIEW_ITEMS)
            .await?;
        let recent_pull_requests = self
            .source
            .pull_requests(project, &repository.id, defaults::REPO_PREVIEW_ITEMS)
            .await?;

        Ok(RepositoryDetail {
            default_branch: repository.default_branch.clone(),
            repository,
            branches,
            recent_commits,
            recent_pull_requests,
        })
    }
}
