//! Error types for directory access.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for directory operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while building clients or fetching directory data.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The identity provider could not produce a credential.
    #[error("failed to create credential: {0}")]
    Credential(String),

    /// The credential exists but could not produce a token.
    #[error("failed to validate credential: {0}")]
    TokenValidation(String),

    #[error("credential validation timed out after {0:?}")]
    ValidationTimeout(Duration),

    /// The API client could not be constructed.
    #[error("failed to create client: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}
