//! Board column fetcher.

use async_trait::async_trait;
use serde_json::json;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts board columns across all of the project's teams.
///
/// The team/board traversal lives in the source implementation; this fetcher
/// only shapes the flattened column list.
pub struct BoardColumnsFetcher;

#[async_trait]
impl ArtifactFetcher for BoardColumnsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::BoardColumns
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let columns = ctx.source().board_columns(ctx.project_name()).await?;
        let items = columns
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "columnType": c.column_type,
                    "itemLimit": c.item_limit,
                    "board": c.board,
                    "team": c.team,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(columns.len() as i64, items))
    }
}
