//! Cluster Client
//!
//! Access to the data-plane cluster for the per-tenant convergence engine.
//! Typed access covers namespaces, deployments, secrets and the `Central`
//! custom resource; everything else (routes, autoscaler configuration,
//! templated resources) goes through [`UnstructuredObject`], a
//! `DynamicObject` tagged with its group/version/kind.
//!
//! "Not found" and "already exists" surface as dedicated
//! [`ClusterError`] variants so callers can branch on them.

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
pub mod unstructured;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
pub use unstructured::UnstructuredObject;
#[cfg(feature = "test-util")]
pub use mock::MockClusterClient;

pub use kube::api::GroupVersionKind;
