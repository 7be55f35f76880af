//! Area and iteration path fetchers.

use async_trait::async_trait;
use serde_json::json;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary, ClassificationGroup};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts the flattened area path tree.
pub struct AreaPathsFetcher;

#[async_trait]
impl ArtifactFetcher for AreaPathsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::AreaPaths
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let nodes = ctx
            .source()
            .classification_nodes(ctx.project_name(), ClassificationGroup::Areas)
            .await?;
        let items = nodes
            .iter()
            .map(|n| {
                json!({
                    "id": n.id,
                    "name": n.name,
                    "path": n.path,
                    "hasChildren": n.has_children,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(nodes.len() as i64, items))
    }
}

/// Extracts the flattened iteration path tree, sprint dates included.
pub struct IterationPathsFetcher;

#[async_trait]
impl ArtifactFetcher for IterationPathsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::IterationPaths
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let nodes = ctx
            .source()
            .classification_nodes(ctx.project_name(), ClassificationGroup::Iterations)
            .await?;
        let items = nodes
            .iter()
            .map(|n| {
                json!({
                    "id": n.id,
                    "name": n.name,
                    "path": n.path,
                    "startDate": n.start_date,
                    "endDate": n.end_date,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(nodes.len() as i64, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fetch_with, sample_nodes};
    use cutover_ado::{MockArtifactSource, MockFailure};

    #[tokio::test]
    async fn test_area_paths_success() {
        let source = MockArtifactSource::new().with_area_paths(sample_nodes(&[
            ("1", "Migrated", "\\Migrated"),
            ("2", "Team A", "\\Migrated\\Team A"),
        ]));

        let summary = fetch_with(&AreaPathsFetcher, source).await.unwrap();
        assert!(summary.extracted);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.items[0]["name"], "Migrated");
    }

    #[tokio::test]
    async fn test_area_paths_failure_is_captured() {
        let source = MockArtifactSource::new()
            .with_failure("area_paths", MockFailure::auth("PAT expired"));

        let err = fetch_with(&AreaPathsFetcher, source).await.unwrap_err();
        assert!(err.message.contains("authentication"));
    }

    #[tokio::test]
    async fn test_iteration_paths_carries_dates() {
        let mut nodes = sample_nodes(&[("1", "Sprint 1", "\\Migrated\\Sprint 1")]);
        nodes[0].start_date = Some(chrono::Utc::now());
        let source = MockArtifactSource::new().with_iteration_paths(nodes);

        let summary = fetch_with(&IterationPathsFetcher, source).await.unwrap();
        assert_eq!(summary.count, 1);
        assert!(!summary.items[0]["startDate"].is_null());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(AreaPathsFetcher.kind(), ArtifactKind::AreaPaths);
        assert_eq!(IterationPathsFetcher.kind(), ArtifactKind::IterationPaths);
        assert!(!AreaPathsFetcher.can_handle(ArtifactKind::IterationPaths));
    }
}
