//! Vertical pod autoscaler for the Central deployment

use cluster_client::{ClusterClientTrait, GroupVersionKind, UnstructuredObject};
use serde_json::json;
use tracing::{debug, info};

use super::resources::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::error::ControllerError;

pub const VPA_NAME: &str = "vpa-config-central";

pub fn vpa_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("autoscaling.k8s.io", "v1", "VerticalPodAutoscaler")
}

pub fn build(namespace: &str) -> UnstructuredObject {
    let mut vpa = UnstructuredObject::new(
        vpa_gvk(),
        namespace,
        VPA_NAME,
        json!({
            "spec": {
                "targetRef": {
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "name": "central",
                },
                "updatePolicy": {
                    "updateMode": "Auto",
                },
            }
        }),
    );
    vpa.labels_mut()
        .insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    vpa
}

pub async fn ensure_exists(cluster: &dyn ClusterClientTrait, namespace: &str) -> Result<(), ControllerError> {
    match cluster.get_object(&vpa_gvk(), namespace, VPA_NAME).await {
        Ok(_) => {
            debug!("VPA {}/{} exists", namespace, VPA_NAME);
            return Ok(());
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => {
            return Err(ControllerError::cluster(
                format!("getting VPA {namespace}/{VPA_NAME}"),
                e,
            ));
        }
    }
    match cluster.create_object(&build(namespace)).await {
        Ok(_) => {
            info!("Created VPA {}/{}", namespace, VPA_NAME);
            Ok(())
        }
        Err(e) if e.is_already_exists() => Ok(()),
        Err(e) => Err(ControllerError::cluster(
            format!("creating VPA {namespace}/{VPA_NAME}"),
            e,
        )),
    }
}

/// `true` if the VPA was already gone, `false` if a delete was just issued
pub async fn ensure_deleted(cluster: &dyn ClusterClientTrait, namespace: &str) -> Result<bool, ControllerError> {
    match cluster.get_object(&vpa_gvk(), namespace, VPA_NAME).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Ok(true),
        Err(e) => {
            return Err(ControllerError::cluster(
                format!("getting VPA {namespace}/{VPA_NAME}"),
                e,
            ));
        }
    }
    match cluster.delete_object(&vpa_gvk(), namespace, VPA_NAME).await {
        Ok(()) => {
            info!("Deleted VPA {}/{}", namespace, VPA_NAME);
            Ok(false)
        }
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(ControllerError::cluster(
            format!("deleting VPA {namespace}/{VPA_NAME}"),
            e,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_client::MockClusterClient;

    #[test]
    fn test_build_targets_central_deployment() {
        let vpa = build("rhacs-abc");

        assert_eq!(vpa.name(), Some(VPA_NAME));
        assert_eq!(vpa.namespace(), Some("rhacs-abc"));
        assert_eq!(vpa.data().pointer("/spec/targetRef/name"), Some(&json!("central")));
        assert_eq!(vpa.data().pointer("/spec/updatePolicy/updateMode"), Some(&json!("Auto")));
    }

    #[tokio::test]
    async fn test_ensure_exists_then_deleted() {
        let cluster = MockClusterClient::new();

        ensure_exists(&cluster, "rhacs-abc").await.unwrap();
        ensure_exists(&cluster, "rhacs-abc").await.unwrap();
        assert_eq!(cluster.write_calls(), 1);
        assert!(cluster.has_object(&vpa_gvk(), "rhacs-abc", VPA_NAME));

        assert!(!ensure_deleted(&cluster, "rhacs-abc").await.unwrap());
        assert!(ensure_deleted(&cluster, "rhacs-abc").await.unwrap());
        assert_eq!(cluster.write_calls(), 2);
    }
}
