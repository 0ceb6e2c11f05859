//! Error types for inference backends.

use autobench_core::InferenceError;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a backend.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend does not serve the requested model.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Backend answered with an error status or error payload.
    #[error("provider API error: {0}")]
    ProviderApi(String),

    /// Request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

impl From<Error> for InferenceError {
    fn from(err: Error) -> Self {
        match err {
            Error::ModelNotFound(_) | Error::ProviderApi(_) => Self::Backend(err.to_string()),
            Error::Request(_) | Error::Serialization(_) => Self::Request(err.to_string()),
        }
    }
}
