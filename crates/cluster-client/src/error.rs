//! Cluster client errors

use thiserror::Error;

/// Errors returned by the cluster API boundary
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Create raced with an existing object of the same name
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Any other Kubernetes API failure
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object is missing required identity (apiVersion, kind, name)
    #[error("invalid object: {0}")]
    Invalid(String),
}

impl ClusterError {
    /// Classify a kube error for the object described by `what`
    pub fn from_kube(err: kube::Error, what: impl std::fmt::Display) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound(what.to_string()),
            kube::Error::Api(api_err) if api_err.code == 409 && api_err.reason == "AlreadyExists" => {
                Self::AlreadyExists(what.to_string())
            }
            other => Self::Kube(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}
