//! Tenant namespace

use std::collections::BTreeMap;

use cluster_client::ClusterClientTrait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use tracing::{debug, info};

use super::resources::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::error::ControllerError;

const TERMINATING: &str = "Terminating";

pub async fn ensure_exists(cluster: &dyn ClusterClientTrait, name: &str) -> Result<(), ControllerError> {
    match cluster.get_namespace(name).await {
        Ok(_) => {
            debug!("Namespace {} exists", name);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            let namespace = Namespace {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    labels: Some(BTreeMap::from([(
                        MANAGED_BY_LABEL.to_string(),
                        MANAGED_BY_VALUE.to_string(),
                    )])),
                    ..Default::default()
                },
                ..Default::default()
            };
            match cluster.create_namespace(&namespace).await {
                Ok(_) => {
                    info!("Created namespace {}", name);
                    Ok(())
                }
                Err(e) if e.is_already_exists() => Ok(()),
                Err(e) => Err(ControllerError::cluster(format!("creating namespace {name}"), e)),
            }
        }
        Err(e) => Err(ControllerError::cluster(format!("getting namespace {name}"), e)),
    }
}

/// `true` once the namespace is gone; a terminating namespace is left alone
pub async fn ensure_deleted(cluster: &dyn ClusterClientTrait, name: &str) -> Result<bool, ControllerError> {
    let namespace = match cluster.get_namespace(name).await {
        Ok(namespace) => namespace,
        Err(e) if e.is_not_found() => return Ok(true),
        Err(e) => return Err(ControllerError::cluster(format!("delete central namespace {name}"), e)),
    };

    let phase = namespace.status.as_ref().and_then(|s| s.phase.as_deref());
    if phase == Some(TERMINATING) {
        debug!("Namespace {} is already terminating", name);
        return Ok(false);
    }

    match cluster.delete_namespace(name).await {
        Ok(()) => {
            info!("Central namespace {} is marked for deletion", name);
            Ok(false)
        }
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(ControllerError::cluster(format!("delete central namespace {name}"), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_client::MockClusterClient;

    #[tokio::test]
    async fn test_ensure_exists_is_idempotent() {
        let cluster = MockClusterClient::new();

        ensure_exists(&cluster, "rhacs-abc").await.unwrap();
        ensure_exists(&cluster, "rhacs-abc").await.unwrap();

        assert_eq!(cluster.actions(), vec!["create Namespace rhacs-abc".to_string()]);
        assert_eq!(cluster.namespace_phase("rhacs-abc").as_deref(), Some("Active"));
    }

    #[tokio::test]
    async fn test_ensure_deleted_skips_terminating_namespace() {
        let cluster = MockClusterClient::new();
        ensure_exists(&cluster, "rhacs-abc").await.unwrap();
        cluster.clear_actions();

        assert!(!ensure_deleted(&cluster, "rhacs-abc").await.unwrap());
        assert_eq!(cluster.namespace_phase("rhacs-abc").as_deref(), Some("Terminating"));

        // Second pass sees the terminating phase and issues no further delete
        assert!(!ensure_deleted(&cluster, "rhacs-abc").await.unwrap());
        assert_eq!(cluster.write_calls(), 1);

        cluster.finalize_namespace("rhacs-abc");
        assert!(ensure_deleted(&cluster, "rhacs-abc").await.unwrap());
    }
}
