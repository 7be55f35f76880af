//! Build pipeline, release pipeline, and pipeline run fetchers.

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary, PipelineRecord};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

fn pipeline_preview(p: &PipelineRecord) -> serde_json::Value {
    json!({
        "id": p.id,
        "name": p.name,
        "folder": p.folder,
        "type": p.configuration_type,
    })
}

/// Extracts build pipeline definitions.
pub struct BuildPipelinesFetcher;

#[async_trait]
impl ArtifactFetcher for BuildPipelinesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::BuildPipelines
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let pipelines = ctx.source().build_pipelines(ctx.project_name()).await?;
        let items = pipelines.iter().map(pipeline_preview).collect();
        Ok(ArtifactSummary::ok(pipelines.len() as i64, items))
    }
}

/// Extracts release pipeline definitions.
pub struct ReleasePipelinesFetcher;

#[async_trait]
impl ArtifactFetcher for ReleasePipelinesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::ReleasePipelines
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let pipelines = ctx.source().release_pipelines(ctx.project_name()).await?;
        let items = pipelines.iter().map(pipeline_preview).collect();
        Ok(ArtifactSummary::ok(pipelines.len() as i64, items))
    }
}

/// Extracts runs across all build pipelines.
///
/// A single pipeline's runs failing is logged and skipped; the definition
/// listing failing fails the fetch.
pub struct PipelineRunsFetcher;

#[async_trait]
impl ArtifactFetcher for PipelineRunsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::PipelineRuns
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let pipelines = ctx.source().build_pipelines(ctx.project_name()).await?;

        let mut runs = Vec::new();
        for pipeline in &pipelines {
            match ctx
                .source()
                .pipeline_runs(ctx.project_name(), pipeline.id)
                .await
            {
                Ok(pipeline_runs) => runs.extend(pipeline_runs),
                Err(e) => {
                    warn!(error = %e, "Failed to list runs of pipeline {}", pipeline.id);
                }
            }
        }

        let items = runs
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "pipelineId": r.pipeline_id,
                    "name": r.name,
                    "state": r.state,
                    "result": r.result,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(runs.len() as i64, items))
    }
}
