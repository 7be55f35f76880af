//! # cutover-core
//!
//! Core types, traits, and abstractions for the cutover migration dashboard.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other cutover crates depend on: the artifact kind enumeration, the
//! extraction job lifecycle types, the repository traits the storage layer
//! implements, and the [`ArtifactSource`] capability the Azure DevOps client
//! implements.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
