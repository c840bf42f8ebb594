//! Fleet manager client errors

use thiserror::Error;

/// Errors that can occur when talking to the fleet manager
#[derive(Debug, Error)]
pub enum FleetManagerError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Fleet manager answered with a non-success status
    #[error("Fleet manager API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token rejected (401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),
}
