//! Work item type and field definition fetchers.

use async_trait::async_trait;
use serde_json::json;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts work item type definitions.
pub struct WorkItemTypesFetcher;

#[async_trait]
impl ArtifactFetcher for WorkItemTypesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::WorkItemTypes
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let types = ctx.source().work_item_types(ctx.project_name()).await?;
        let items = types
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "referenceName": t.reference_name,
                    "description": t.description,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(types.len() as i64, items))
    }
}

/// Extracts work item field definitions, custom fields included.
pub struct CustomFieldsFetcher;

#[async_trait]
impl ArtifactFetcher for CustomFieldsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::CustomFields
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let fields = ctx.source().fields(ctx.project_name()).await?;
        let items = fields
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "referenceName": f.reference_name,
                    "type": f.field_type,
                    "readOnly": f.read_only,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(fields.len() as i64, items))
    }
}
