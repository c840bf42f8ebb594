//! Controller-specific error types.
//!
//! Three variants are sentinels rather than failures: `Busy`, `NotChanged`
//! and `DeletionInProgress` tell the caller to come back later.

use cluster_client::ClusterError;
use fleet_manager_client::FleetManagerError;
use thiserror::Error;

use crate::charts::ChartError;

/// Errors that can occur in the fleetshard synchronizer.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Another reconciliation is running for the same central
    #[error("reconciler is busy")]
    Busy,

    /// Nothing to do for this central
    #[error("central not changed, skipping reconciliation")]
    NotChanged,

    /// Teardown requested, dependent resources still present
    #[error("central deletion in progress")]
    DeletionInProgress,

    /// Cluster API call failed; `context` names the operation and object
    #[error("{context}: {source}")]
    Cluster {
        context: String,
        #[source]
        source: ClusterError,
    },

    /// Desired state could not be serialized for fingerprinting
    #[error("hashing central: {0}")]
    Fingerprint(#[source] serde_json::Error),

    /// Resource quantity that is not a valid Kubernetes quantity
    #[error("invalid quantity {value:?} for {resource}")]
    InvalidQuantity { resource: String, value: String },

    /// Revision annotation missing or not a number
    #[error("invalid revision annotation on central {name}: {value:?}")]
    InvalidRevision { name: String, value: Option<String> },

    /// The `central-tls` secret has not been written by the operator yet
    #[error("central TLS secret not found in namespace {0}")]
    CentralTlsSecretNotFound(String),

    /// Route exists but no router admitted it
    #[error("route {0} has no admitted ingress")]
    RouteNotAdmitted(String),

    /// Talking to the tenant's Central API failed
    #[error("auth provider: {0}")]
    AuthProvider(String),

    /// Rendering the tenant resources chart failed
    #[error("rendering resources chart: {0}")]
    Chart(#[from] ChartError),

    /// Fleet manager API error
    #[error("fleet manager: {0}")]
    FleetManager(#[from] FleetManagerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Runtime or server loop failed
    #[error("Runtime failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Wrap a cluster error with the operation it came from
    pub fn cluster(context: impl Into<String>, source: ClusterError) -> Self {
        Self::Cluster {
            context: context.into(),
            source,
        }
    }

    /// `Busy`, `NotChanged` and `DeletionInProgress` are not failures
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Busy | Self::NotChanged | Self::DeletionInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(ControllerError::Busy.is_sentinel());
        assert!(ControllerError::NotChanged.is_sentinel());
        assert!(ControllerError::DeletionInProgress.is_sentinel());
        assert!(!ControllerError::CentralTlsSecretNotFound("ns".to_string()).is_sentinel());
    }

    #[test]
    fn test_cluster_error_keeps_context() {
        let err = ControllerError::cluster(
            "creating namespace rhacs-abc",
            ClusterError::AlreadyExists("Namespace rhacs-abc".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "creating namespace rhacs-abc: already exists: Namespace rhacs-abc"
        );
    }
}
