//! Error types for cutover.

use thiserror::Error;

/// Result type alias using cutover's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cutover operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An active extraction job already exists for the (project, kind) pair
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(uuid::Uuid),

    /// Extraction job not found
    #[error("Extraction job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Artifact source rejected the credential
    #[error("Upstream authentication failed: {0}")]
    UpstreamAuth(String),

    /// Artifact source call exceeded its deadline
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Artifact source returned a payload we could not decode
    #[error("Upstream malformed response: {0}")]
    UpstreamMalformed(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Error::UpstreamTimeout(e.to_string());
        }
        if let Some(status) = e.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Error::UpstreamAuth(e.to_string());
            }
        }
        if e.is_decode() {
            return Error::UpstreamMalformed(e.to_string());
        }
        Error::Request(e.to_string())
    }
}
