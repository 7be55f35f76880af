//! Wiki page fetcher.

use async_trait::async_trait;
use serde_json::json;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts wiki page paths across the project's wikis.
pub struct WikiPagesFetcher;

#[async_trait]
impl ArtifactFetcher for WikiPagesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::WikiPages
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let pages = ctx.source().wiki_pages(ctx.project_name()).await?;
        let items = pages
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "path": p.path,
                    "wiki": p.wiki,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(pages.len() as i64, items))
    }
}
