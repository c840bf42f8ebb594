//! OpenShift routes exposing a tenant's Central
//!
//! The re-encrypt route carries the UI endpoint and needs the CA of the
//! `central-tls` secret, which the operator writes once Central starts.
//! The passthrough route carries the data endpoint.

use cluster_client::{ClusterClientTrait, GroupVersionKind, UnstructuredObject};
use crds::{ManagedCentral, RouteStatus};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::resources::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::error::ControllerError;

pub const REENCRYPT_ROUTE: &str = "managed-central-reencrypt";
pub const PASSTHROUGH_ROUTE: &str = "managed-central-passthrough";
pub const CENTRAL_TLS_SECRET: &str = "central-tls";

const CENTRAL_SERVICE: &str = "central";
const CA_KEY: &str = "ca.pem";

pub fn route_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("route.openshift.io", "v1", "Route")
}

fn route(namespace: &str, name: &str, host: &str, tls: Value) -> UnstructuredObject {
    let mut route = UnstructuredObject::new(
        route_gvk(),
        namespace,
        name,
        json!({
            "spec": {
                "host": host,
                "port": { "targetPort": "https" },
                "to": { "kind": "Service", "name": CENTRAL_SERVICE },
                "tls": tls,
            }
        }),
    );
    route
        .labels_mut()
        .insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    route
}

pub fn reencrypt_route(desired: &ManagedCentral, ca_cert: &str) -> UnstructuredObject {
    route(
        &desired.metadata.namespace,
        REENCRYPT_ROUTE,
        &desired.spec.ui_endpoint.host,
        json!({
            "termination": "reencrypt",
            "destinationCACertificate": ca_cert,
        }),
    )
}

pub fn passthrough_route(desired: &ManagedCentral) -> UnstructuredObject {
    route(
        &desired.metadata.namespace,
        PASSTHROUGH_ROUTE,
        &desired.spec.data_endpoint.host,
        json!({ "termination": "passthrough" }),
    )
}

async fn central_ca(cluster: &dyn ClusterClientTrait, namespace: &str) -> Result<String, ControllerError> {
    let secret = match cluster.get_secret(namespace, CENTRAL_TLS_SECRET).await {
        Ok(secret) => secret,
        Err(e) if e.is_not_found() => {
            return Err(ControllerError::CentralTlsSecretNotFound(namespace.to_string()));
        }
        Err(e) => {
            return Err(ControllerError::cluster(
                format!("getting secret {namespace}/{CENTRAL_TLS_SECRET}"),
                e,
            ));
        }
    };
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(CA_KEY))
        .map(|ca| String::from_utf8_lossy(&ca.0).into_owned())
        .ok_or_else(|| ControllerError::CentralTlsSecretNotFound(namespace.to_string()))
}

async fn route_exists(cluster: &dyn ClusterClientTrait, namespace: &str, name: &str) -> Result<bool, ControllerError> {
    match cluster.get_object(&route_gvk(), namespace, name).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(ControllerError::cluster(
            format!("retrieving route {namespace}/{name}"),
            e,
        )),
    }
}

async fn create_route(cluster: &dyn ClusterClientTrait, route: &UnstructuredObject) -> Result<(), ControllerError> {
    cluster
        .create_object(route)
        .await
        .map_err(|e| ControllerError::cluster(format!("creating {route}"), e))?;
    info!("Created {}", route);
    Ok(())
}

/// Create whichever of the two routes is missing; existing routes are left as they are
pub async fn ensure_exist(cluster: &dyn ClusterClientTrait, desired: &ManagedCentral) -> Result<(), ControllerError> {
    let namespace = &desired.metadata.namespace;

    if !route_exists(cluster, namespace, REENCRYPT_ROUTE).await? {
        let ca_cert = central_ca(cluster, namespace).await?;
        create_route(cluster, &reencrypt_route(desired, &ca_cert)).await?;
    }
    if !route_exists(cluster, namespace, PASSTHROUGH_ROUTE).await? {
        create_route(cluster, &passthrough_route(desired)).await?;
    }
    Ok(())
}

/// `true` if the route was already gone; a freshly issued delete reports `false`
pub async fn ensure_deleted(cluster: &dyn ClusterClientTrait, namespace: &str, name: &str) -> Result<bool, ControllerError> {
    if !route_exists(cluster, namespace, name).await? {
        return Ok(true);
    }
    match cluster.delete_object(&route_gvk(), namespace, name).await {
        Ok(()) => {
            info!("Deleted route {}/{}", namespace, name);
            Ok(false)
        }
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(ControllerError::cluster(format!("delete central route {namespace}/{name}"), e)),
    }
}

fn admitted(ingress: &Value) -> bool {
    ingress
        .get("conditions")
        .and_then(Value::as_array)
        .is_some_and(|conditions| {
            conditions.iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some("Admitted")
                    && c.get("status").and_then(Value::as_str) == Some("True")
            })
        })
}

/// Host and router of the first ingress that admitted the route
pub async fn route_status(
    cluster: &dyn ClusterClientTrait,
    namespace: &str,
    name: &str,
) -> Result<RouteStatus, ControllerError> {
    let route = cluster
        .get_object(&route_gvk(), namespace, name)
        .await
        .map_err(|e| ControllerError::cluster(format!("retrieving route {namespace}/{name}"), e))?;

    let ingress = route
        .data()
        .pointer("/status/ingress")
        .and_then(Value::as_array)
        .and_then(|ingresses| ingresses.iter().find(|i| admitted(i)))
        .ok_or_else(|| ControllerError::RouteNotAdmitted(format!("{namespace}/{name}")))?;

    debug!("Route {}/{} admitted", namespace, name);
    let field = |key: &str| ingress.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(RouteStatus {
        domain: field("host"),
        router: field("routerCanonicalHostname"),
    })
}

/// Status of both routes, re-encrypt first
pub async fn statuses(cluster: &dyn ClusterClientTrait, namespace: &str) -> Result<Vec<RouteStatus>, ControllerError> {
    Ok(vec![
        route_status(cluster, namespace, REENCRYPT_ROUTE).await?,
        route_status(cluster, namespace, PASSTHROUGH_ROUTE).await?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::managed_central;
    use cluster_client::MockClusterClient;

    #[tokio::test]
    async fn test_missing_tls_secret() {
        let cluster = MockClusterClient::new();
        let desired = managed_central("abc");

        let err = ensure_exist(&cluster, &desired).await.unwrap_err();

        assert!(matches!(err, ControllerError::CentralTlsSecretNotFound(ns) if ns == "rhacs-abc"));
        assert_eq!(cluster.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_ensure_exist_creates_both_routes() {
        let cluster = MockClusterClient::new();
        cluster.add_secret("rhacs-abc", CENTRAL_TLS_SECRET, &[(CA_KEY, "CA")]);
        let desired = managed_central("abc");

        ensure_exist(&cluster, &desired).await.unwrap();
        ensure_exist(&cluster, &desired).await.unwrap();

        assert_eq!(
            cluster.actions(),
            vec![
                format!("create Route rhacs-abc/{REENCRYPT_ROUTE}"),
                format!("create Route rhacs-abc/{PASSTHROUGH_ROUTE}"),
            ]
        );
        let reencrypt = cluster.get_object(&route_gvk(), "rhacs-abc", REENCRYPT_ROUTE).await.unwrap();
        assert_eq!(reencrypt.data().pointer("/spec/tls/destinationCACertificate"), Some(&json!("CA")));
        assert_eq!(
            reencrypt.data().pointer("/spec/host"),
            Some(&json!(desired.spec.ui_endpoint.host))
        );
    }

    #[tokio::test]
    async fn test_delete_needs_two_passes() {
        let cluster = MockClusterClient::new();
        cluster.insert_object(passthrough_route(&managed_central("abc")));

        assert!(!ensure_deleted(&cluster, "rhacs-abc", PASSTHROUGH_ROUTE).await.unwrap());
        assert!(ensure_deleted(&cluster, "rhacs-abc", PASSTHROUGH_ROUTE).await.unwrap());
    }

    #[tokio::test]
    async fn test_route_gone_before_delete_counts_as_deleted() {
        let cluster = MockClusterClient::new();
        cluster.insert_object(passthrough_route(&managed_central("abc")));
        cluster.set_delete_not_found(&route_gvk(), "rhacs-abc", PASSTHROUGH_ROUTE);

        assert!(ensure_deleted(&cluster, "rhacs-abc", PASSTHROUGH_ROUTE).await.unwrap());
        assert_eq!(cluster.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_statuses_require_admission() {
        let cluster = MockClusterClient::new();
        cluster.add_secret("rhacs-abc", CENTRAL_TLS_SECRET, &[(CA_KEY, "CA")]);
        let desired = managed_central("abc");
        ensure_exist(&cluster, &desired).await.unwrap();

        assert!(matches!(
            statuses(&cluster, "rhacs-abc").await,
            Err(ControllerError::RouteNotAdmitted(_))
        ));

        cluster.admit_route("rhacs-abc", REENCRYPT_ROUTE, "router-default.apps.example.com");
        cluster.admit_route("rhacs-abc", PASSTHROUGH_ROUTE, "router-default.apps.example.com");
        let routes = statuses(&cluster, "rhacs-abc").await.unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].domain, desired.spec.ui_endpoint.host);
        assert_eq!(routes[1].domain, desired.spec.data_endpoint.host);
        assert_eq!(routes[1].router, "router-default.apps.example.com");
    }
}
