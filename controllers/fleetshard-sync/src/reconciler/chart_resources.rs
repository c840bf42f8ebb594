//! Auxiliary resources rendered from the tenant resources chart
//!
//! Objects are converged one by one; there is no batch apply.

use cluster_client::{ClusterClientTrait, UnstructuredObject};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::resources::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::charts::{self, Chart};
use crate::error::ControllerError;

pub const RELEASE_NAME: &str = "tenant-resources";

/// Values handed to the chart: ownership labels and optional proxy image
pub fn chart_values(egress_proxy_image: &str) -> Value {
    let mut values = json!({
        "labels": { MANAGED_BY_LABEL: MANAGED_BY_VALUE },
    });
    if !egress_proxy_image.is_empty() {
        charts::coalesce(&mut values, &json!({"egressProxy": {"image": egress_proxy_image}}));
    }
    values
}

pub fn render(
    chart: &Chart,
    namespace: &str,
    egress_proxy_image: &str,
) -> Result<Vec<UnstructuredObject>, ControllerError> {
    Ok(chart.render(RELEASE_NAME, namespace, &chart_values(egress_proxy_image))?)
}

fn describe(object: &UnstructuredObject) -> String {
    let gvk = object.gvk();
    format!(
        "{}/{}/{} {}/{}",
        gvk.group,
        gvk.version,
        gvk.kind,
        object.namespace().unwrap_or_default(),
        object.name().unwrap_or_default()
    )
}

pub async fn ensure_exist(
    cluster: &dyn ClusterClientTrait,
    objects: &[UnstructuredObject],
) -> Result<(), ControllerError> {
    for object in objects {
        let namespace = object.namespace().unwrap_or_default();
        let name = object.name().unwrap_or_default();
        match cluster.get_object(object.gvk(), namespace, name).await {
            Ok(_) => continue,
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(ControllerError::cluster(
                    format!("failed to retrieve object {}", describe(object)),
                    e,
                ));
            }
        }
        match cluster.create_object(object).await {
            Ok(_) => info!("Created {}", object),
            Err(e) if e.is_already_exists() => debug!("{} appeared concurrently", object),
            Err(e) => {
                return Err(ControllerError::cluster(
                    format!("failed to create object {}", describe(object)),
                    e,
                ));
            }
        }
    }
    Ok(())
}

/// `false` while any object is still being finalized
pub async fn ensure_deleted(
    cluster: &dyn ClusterClientTrait,
    objects: &[UnstructuredObject],
) -> Result<bool, ControllerError> {
    let mut wait_for_delete = false;
    for object in objects {
        let namespace = object.namespace().unwrap_or_default();
        let name = object.name().unwrap_or_default();
        let existing = match cluster.get_object(object.gvk(), namespace, name).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                return Err(ControllerError::cluster(
                    format!("retrieving object {}", describe(object)),
                    e,
                ));
            }
        };
        if existing.is_terminating() {
            debug!("{} is terminating", existing);
            wait_for_delete = true;
            continue;
        }
        match cluster.delete_object(object.gvk(), namespace, name).await {
            Ok(()) => info!("Deleted {}", object),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(ControllerError::cluster(
                    format!("deleting object {}", describe(object)),
                    e,
                ));
            }
        }
    }
    Ok(!wait_for_delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::tenant_resources;
    use cluster_client::MockClusterClient;

    #[test]
    fn test_chart_values() {
        assert_eq!(
            chart_values(""),
            json!({"labels": {"app.kubernetes.io/managed-by": "rhacs-fleetshard"}})
        );
        assert_eq!(
            chart_values("quay.io/proxy:2").pointer("/egressProxy/image"),
            Some(&json!("quay.io/proxy:2"))
        );
    }

    #[tokio::test]
    async fn test_ensure_exist_creates_missing_only() {
        let cluster = MockClusterClient::new();
        let objects = render(&tenant_resources(), "rhacs-abc", "").unwrap();
        cluster.insert_object(objects[0].clone());

        ensure_exist(&cluster, &objects).await.unwrap();

        assert_eq!(cluster.write_calls(), objects.len() - 1);
        for object in &objects {
            assert!(cluster.has_object(object.gvk(), "rhacs-abc", object.name().unwrap()));
        }

        cluster.clear_actions();
        ensure_exist(&cluster, &objects).await.unwrap();
        assert_eq!(cluster.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_ensure_deleted_waits_for_terminating_objects() {
        let cluster = MockClusterClient::new();
        let objects = render(&tenant_resources(), "rhacs-abc", "").unwrap();

        let mut terminating = UnstructuredObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {
                "name": "egress-proxy",
                "namespace": "rhacs-abc",
                "deletionTimestamp": "2024-01-01T00:00:00Z"
            }
        }))
        .unwrap();
        terminating.default_namespace("rhacs-abc");
        cluster.insert_object(terminating);
        ensure_exist(&cluster, &objects).await.unwrap();
        cluster.clear_actions();

        assert!(!ensure_deleted(&cluster, &objects).await.unwrap());
        // Deployment and NetworkPolicy deleted, the terminating Service left alone
        assert_eq!(cluster.write_calls(), 2);
        assert!(!cluster.actions().iter().any(|a| a.contains("Service")));

        assert!(ensure_deleted(&cluster, &objects[..1]).await.unwrap());
    }
}
