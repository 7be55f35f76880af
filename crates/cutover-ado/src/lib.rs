//! # cutover-ado
//!
//! Azure DevOps REST client for cutover.
//!
//! [`AdoClient`] implements the `ArtifactSource` capability from
//! `cutover-core` against the Azure DevOps REST API (api-version 7.0):
//! classification trees, work item tracking (WIQL query + batch expansion),
//! git repositories, test management, and pipelines. [`mock`] provides a
//! scriptable in-process source for tests.

pub mod client;
pub mod mock;
pub mod wire;

pub use client::AdoClient;
pub use mock::{MockArtifactSource, MockFailure};
