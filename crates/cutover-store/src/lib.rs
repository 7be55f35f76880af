//! # cutover-store
//!
//! Repository implementations for cutover.
//!
//! The orchestration engine only ever sees the repository traits from
//! `cutover-core`; this crate provides the concrete backend and the [`Store`]
//! bundle handed around the application. The shipped backend is in-memory.
//! Swapping in a SQL store means implementing the same three traits and
//! changing nothing in the jobs engine.

pub mod memory;

use std::sync::Arc;

use cutover_core::{ConnectionRepository, ExtractionJobRepository, ProjectRepository};

/// Bundle of repository handles shared across the application.
#[derive(Clone)]
pub struct Store {
    /// Project records and artifact summaries.
    pub projects: Arc<dyn ProjectRepository>,
    /// Extraction job lifecycle records.
    pub jobs: Arc<dyn ExtractionJobRepository>,
    /// Stored instance connections.
    pub connections: Arc<dyn ConnectionRepository>,
}

impl Store {
    /// Create a store backed by shared in-memory state.
    pub fn in_memory() -> Self {
        let (projects, jobs, connections) = memory::repositories();
        Self {
            projects: Arc::new(projects),
            jobs: Arc::new(jobs),
            connections: Arc::new(connections),
        }
    }
}
