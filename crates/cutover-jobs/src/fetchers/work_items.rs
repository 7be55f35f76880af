//! Work item fetcher: WIQL id query followed by batch field expansion.

use async_trait::async_trait;
use serde_json::json;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts work items in two round-trips: a WIQL query returning matching
/// ids ordered ascending (capped at [`defaults::WORK_ITEM_BATCH`] to keep
/// payloads bounded), then a batch call expanding all fields.
///
/// Zero matching ids is a successful empty extraction, not an error.
pub struct WorkItemsFetcher;

#[async_trait]
impl ArtifactFetcher for WorkItemsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::WorkItems
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);

        let ids = ctx
            .source()
            .work_item_ids(ctx.project_name(), defaults::WORK_ITEM_BATCH)
            .await?;
        if ids.is_empty() {
            return Ok(ArtifactSummary::ok(0, Vec::new()));
        }

        let total = ids.len() as i64;
        ctx.report_progress(defaults::PROGRESS_EXPANDING, 0, total);

        let records = ctx.source().work_items(ctx.project_name(), &ids).await?;
        let items = records
            .iter()
            .map(|w| {
                json!({
                    "id": w.id,
                    "title": w.title(),
                    "type": w.work_item_type(),
                    "state": w.state(),
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(records.len() as i64, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fetch_with;
    use cutover_ado::{MockArtifactSource, MockFailure};
    use cutover_core::WorkItemRecord;

    fn record(id: i64, title: &str) -> WorkItemRecord {
        WorkItemRecord {
            id,
            fields: json!({
                "System.Title": title,
                "System.WorkItemType": "Bug",
                "System.State": "Active",
            }),
        }
    }

    #[tokio::test]
    async fn test_two_step_fetch() {
        let source = MockArtifactSource::new()
            .with_work_items(vec![3, 1, 2], vec![record(1, "a"), record(2, "b"), record(3, "c")]);

        let summary = fetch_with(&WorkItemsFetcher, source.clone()).await.unwrap();
        assert!(summary.extracted);
        assert_eq!(summary.count, 3);
        // Batch expansion follows the ascending id order of the query step.
        assert_eq!(summary.items[0]["id"], 1);
        assert_eq!(summary.items[0]["title"], "a");
        assert_eq!(source.call_count("work_item_ids"), 1);
        assert_eq!(source.call_count("work_items"), 1);
    }

    #[tokio::test]
    async fn test_zero_ids_is_successful_empty_summary() {
        let source = MockArtifactSource::new();
        let summary = fetch_with(&WorkItemsFetcher, source.clone()).await.unwrap();
        assert!(summary.extracted);
        assert_eq!(summary.count, 0);
        assert!(summary.items.is_empty());
        assert!(summary.error.is_none());
        // The batch call is skipped entirely.
        assert_eq!(source.call_count("work_items"), 0);
    }

    #[tokio::test]
    async fn test_query_step_failure() {
        let source = MockArtifactSource::new()
            .with_failure("work_item_ids", MockFailure::timeout("WIQL timed out"));
        let err = fetch_with(&WorkItemsFetcher, source).await.unwrap_err();
        assert!(err.message.to_lowercase().contains("timeout"));
    }

    #[tokio::test]
    async fn test_batch_step_failure() {
        let source = MockArtifactSource::new()
            .with_work_items(vec![1], vec![record(1, "a")])
            .with_failure("work_items", MockFailure::malformed("truncated body"));
        let err = fetch_with(&WorkItemsFetcher, source).await.unwrap_err();
        assert!(err.message.contains("malformed"));
    }
}
