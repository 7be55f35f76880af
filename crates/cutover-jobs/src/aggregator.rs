//! Progress aggregator: folds terminal fetch outcomes into project state.

use tracing::{info, warn};
use uuid::Uuid;

use cutover_core::{ArtifactKind, ArtifactSummary, Result};
use cutover_store::Store;

/// Folds a terminal job outcome into the owning project's artifact summary
/// map and the job history.
///
/// Summaries are replaced wholesale per kind, never merged: re-extracting
/// always supersedes the previous summary, and a failed re-extraction
/// overwrites a previously successful one with the error state. The job
/// record itself becomes the history entry, so successes and failures are
/// equally auditable.
pub struct ProgressAggregator {
    store: Store,
}

impl ProgressAggregator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record a successful extraction: summary replaced, then the job moved
    /// to `completed` with `extracted_items` equal to the summary count.
    ///
    /// The summary lands before the job turns terminal so a poller observing
    /// the terminal state always sees the new summary.
    pub async fn record_success(
        &self,
        job_id: Uuid,
        project_id: Uuid,
        kind: ArtifactKind,
        summary: ArtifactSummary,
    ) -> Result<()> {
        let count = summary.count;
        self.store
            .projects
            .put_artifact_summary(project_id, kind, summary)
            .await?;
        self.store.jobs.complete(job_id, count, count).await?;
        info!(
            job_id = %job_id,
            project_id = %project_id,
            artifact_kind = %kind,
            result_count = count,
            "Extraction aggregated"
        );
        Ok(())
    }

    /// Record a failed extraction: the kind's summary is overwritten with the
    /// error state, then the job moved to `failed`.
    pub async fn record_failure(
        &self,
        job_id: Uuid,
        project_id: Uuid,
        kind: ArtifactKind,
        message: &str,
    ) -> Result<()> {
        self.store
            .projects
            .put_artifact_summary(project_id, kind, ArtifactSummary::failed(message))
            .await?;
        self.store.jobs.fail(job_id, message).await?;
        warn!(
            job_id = %job_id,
            project_id = %project_id,
            artifact_kind = %kind,
            error = message,
            "Extraction failed"
        );
        Ok(())
    }
}
