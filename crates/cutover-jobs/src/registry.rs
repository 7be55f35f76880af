//! Fetcher registry for dispatching extraction by artifact kind.

use std::collections::HashMap;
use std::sync::Arc;

use cutover_core::ArtifactKind;

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchError, FetchResult};
use crate::fetchers::*;

/// Registry mapping artifact kinds to their fetcher implementations.
pub struct FetcherRegistry {
    fetchers: HashMap<ArtifactKind, Arc<dyn ArtifactFetcher>>,
}

impl FetcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            fetchers: HashMap::new(),
        }
    }

    /// Registry with every standard fetcher registered.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AreaPathsFetcher));
        registry.register(Arc::new(IterationPathsFetcher));
        registry.register(Arc::new(WorkItemTypesFetcher));
        registry.register(Arc::new(CustomFieldsFetcher));
        registry.register(Arc::new(BoardColumnsFetcher));
        registry.register(Arc::new(WikiPagesFetcher));
        registry.register(Arc::new(WorkItemsFetcher));
        registry.register(Arc::new(RepositoriesFetcher));
        registry.register(Arc::new(TestPlansFetcher));
        registry.register(Arc::new(TestSuitesFetcher));
        registry.register(Arc::new(TestCasesFetcher));
        registry.register(Arc::new(TestResultsFetcher));
        registry.register(Arc::new(BuildPipelinesFetcher));
        registry.register(Arc::new(ReleasePipelinesFetcher));
        registry.register(Arc::new(PipelineRunsFetcher));
        registry
    }

    /// Register a fetcher. Replaces any existing fetcher for the same kind.
    pub fn register(&mut self, fetcher: Arc<dyn ArtifactFetcher>) {
        self.fetchers.insert(fetcher.kind(), fetcher);
    }

    /// Fetch using the registered strategy for the given kind.
    pub async fn fetch(&self, kind: ArtifactKind, ctx: &FetchContext) -> FetchResult {
        let fetcher = self.fetchers.get(&kind).ok_or_else(|| {
            FetchError::new(format!("No fetcher registered for artifact kind: {}", kind))
        })?;
        fetcher.fetch(ctx).await
    }

    /// List all kinds that have registered fetchers.
    pub fn available_kinds(&self) -> Vec<ArtifactKind> {
        self.fetchers.keys().copied().collect()
    }

    /// Check if a fetcher is registered for the given kind.
    pub fn has_fetcher(&self, kind: ArtifactKind) -> bool {
        self.fetchers.contains_key(&kind)
    }
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
