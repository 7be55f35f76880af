//! Fetcher trait and execution context for artifact extraction.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use cutover_core::{ArtifactKind, ArtifactSource, ArtifactSummary, Project};

/// Progress callback: `(percent, extracted, total)`.
pub type ProgressCallback = Box<dyn Fn(i32, i64, i64) + Send + Sync>;

/// Context handed to a fetcher for one extraction attempt.
pub struct FetchContext {
    /// The project being extracted.
    pub project: Project,
    source: Arc<dyn ArtifactSource>,
    progress_callback: Option<ProgressCallback>,
}

impl FetchContext {
    /// Create a new fetch context.
    pub fn new(project: Project, source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            project,
            source,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, i64, i64) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report best-effort progress to the callback.
    pub fn report_progress(&self, percent: i32, extracted: i64, total: i64) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, extracted, total);
        }
    }

    /// The artifact source to call.
    pub fn source(&self) -> &dyn ArtifactSource {
        self.source.as_ref()
    }

    /// Project name on the source instance (the API's project scope).
    pub fn project_name(&self) -> &str {
        &self.project.name
    }
}

/// Failure captured at the fetcher boundary.
///
/// Fetchers convert every upstream error into this type; nothing below the
/// manager ever sees a raw transport error, and nothing panics across the
/// boundary.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<cutover_core::Error> for FetchError {
    fn from(e: cutover_core::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

/// Result of one fetch attempt.
pub type FetchResult = std::result::Result<ArtifactSummary, FetchError>;

/// One extraction strategy per artifact kind.
///
/// A fetcher is a pure transformer over remote responses: it calls the
/// source, shapes the records into a bounded [`ArtifactSummary`], and has no
/// other side effects. Fetchers for different kinds are independent; a
/// failure in one never prevents or corrupts another running in the same
/// batch.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// The artifact kind this fetcher extracts.
    fn kind(&self) -> ArtifactKind;

    /// Run the extraction.
    async fn fetch(&self, ctx: &FetchContext) -> FetchResult;

    /// Check if this fetcher handles the given kind.
    fn can_handle(&self, kind: ArtifactKind) -> bool {
        self.kind() == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_project;
    use cutover_ado::MockArtifactSource;
    use cutover_core::Error;
    use std::sync::Mutex;

    #[test]
    fn test_fetch_context_progress_callback() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();

        let ctx = FetchContext::new(sample_project("Alpha"), Arc::new(MockArtifactSource::new()))
            .with_progress_callback(move |percent, extracted, total| {
                log_clone.lock().unwrap().push((percent, extracted, total));
            });

        ctx.report_progress(10, 0, 0);
        ctx.report_progress(50, 3, 6);
        ctx.report_progress(100, 6, 6);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1], (50, 3, 6));
    }

    #[test]
    fn test_fetch_context_no_callback_does_not_panic() {
        let ctx = FetchContext::new(sample_project("Alpha"), Arc::new(MockArtifactSource::new()));
        ctx.report_progress(50, 0, 0);
    }

    #[test]
    fn test_fetch_error_from_core_error() {
        let err: FetchError = Error::UpstreamTimeout("deadline exceeded".into()).into();
        assert!(err.message.contains("timeout"));
    }

    #[test]
    fn test_project_name_comes_from_project() {
        let ctx = FetchContext::new(sample_project("Gamma"), Arc::new(MockArtifactSource::new()));
        assert_eq!(ctx.project_name(), "Gamma");
    }
}
