//! # cutover-jobs
//!
//! Extraction job orchestration engine for cutover.
//!
//! This crate provides:
//! - One fetch strategy per artifact kind, dispatched through a registry
//! - An extraction manager owning the job lifecycle
//!   (`queued -> in_progress -> {completed, failed}`) with atomic
//!   at-most-one-active enforcement per (project, kind) pair
//! - A progress aggregator folding terminal outcomes into project summaries
//! - A consumer-side poller with exactly-once cache reconciliation
//!
//! ## Example
//!
//! ```ignore
//! use cutover_jobs::{ExtractionManager, JobPoller, ProjectCache};
//! use cutover_store::Store;
//!
//! let store = Store::in_memory();
//! let manager = Arc::new(ExtractionManager::new(store, source));
//!
//! let job_id = manager.start(project_id, ArtifactKind::WorkItems).await?;
//!
//! let cache = Arc::new(ProjectCache::new());
//! let poller = JobPoller::new(manager.clone(), cache.clone());
//! let handle = poller.watch(job_id);
//! ```

pub mod aggregator;
pub mod fetcher;
pub mod fetchers;
pub mod manager;
pub mod poller;
pub mod registry;

// Re-export core types
pub use cutover_core::*;

pub use aggregator::ProgressAggregator;
pub use fetcher::{ArtifactFetcher, FetchContext, FetchError, FetchResult};
pub use fetchers::{
    AreaPathsFetcher, BoardColumnsFetcher, BuildPipelinesFetcher, CustomFieldsFetcher,
    IterationPathsFetcher, PipelineRunsFetcher, ReleasePipelinesFetcher, RepositoriesFetcher,
    RepositoryInspector, TestCasesFetcher, TestPlansFetcher, TestResultsFetcher,
    TestSuitesFetcher, WikiPagesFetcher, WorkItemTypesFetcher, WorkItemsFetcher,
};
pub use manager::{ExtractionEvent, ExtractionManager, ManagerConfig, StartOutcome};
pub use poller::{JobPoller, PollHandle, PollOutcome, PollerConfig, ProjectCache, StatusSource};
pub use registry::FetcherRegistry;
