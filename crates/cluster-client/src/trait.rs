//! ClusterClient trait for mocking
//!
//! The concrete [`crate::KubeClusterClient`] talks to the API server; tests use
//! [`crate::MockClusterClient`] (feature `test-util`).

use crds::Central;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::GroupVersionKind;

use crate::error::ClusterError;
use crate::unstructured::UnstructuredObject;

/// Cluster operations used by the convergence engine
///
/// Every object is addressed by (namespace, name). All async methods must be
/// `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    // Namespaces
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClusterError>;
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, ClusterError>;
    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError>;

    // Central custom resource
    async fn get_central(&self, namespace: &str, name: &str) -> Result<Central, ClusterError>;
    async fn create_central(&self, central: &Central) -> Result<Central, ClusterError>;
    /// Replace an existing Central; `central` must carry the current resourceVersion
    async fn update_central(&self, central: &Central) -> Result<Central, ClusterError>;
    async fn delete_central(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    // GVK-tagged objects (routes, autoscaler configuration, chart resources)
    async fn get_object(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<UnstructuredObject, ClusterError>;
    async fn create_object(&self, object: &UnstructuredObject) -> Result<UnstructuredObject, ClusterError>;
    async fn delete_object(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterError>;

    // Read-only probes
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError>;
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError>;

    /// Whether the API server serves the OpenShift route API group
    async fn routes_supported(&self) -> Result<bool, ClusterError>;
}
