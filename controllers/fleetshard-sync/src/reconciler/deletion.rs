//! Ordered teardown of everything a central owns
//!
//! Steps run in dependency order: routes, the Central CR, the VPA, the
//! chart objects and finally the namespace. Every step runs on each pass and
//! reports whether its resource is confirmed absent; the central counts as
//! deleted only when all of them agree within the same pass.

use cluster_client::{ClusterClientTrait, UnstructuredObject};
use tracing::{debug, info};

use super::{chart_resources, namespace, routes, vpa};
use crate::error::ControllerError;

async fn ensure_central_cr_deleted(
    cluster: &dyn ClusterClientTrait,
    namespace: &str,
    name: &str,
) -> Result<bool, ControllerError> {
    match cluster.get_central(namespace, name).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Ok(true),
        Err(e) => {
            return Err(ControllerError::cluster(
                format!("delete central CR {namespace}/{name}"),
                e,
            ));
        }
    }
    match cluster.delete_central(namespace, name).await {
        Ok(()) => {
            info!("Central CR {}/{} is marked for deletion", namespace, name);
            Ok(false)
        }
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(ControllerError::cluster(
            format!("delete central CR {namespace}/{name}"),
            e,
        )),
    }
}

/// One deletion pass; `Ok(true)` once every dependent resource is gone
pub async fn ensure_deleted(
    cluster: &dyn ClusterClientTrait,
    namespace: &str,
    name: &str,
    use_routes: bool,
    chart_objects: &[UnstructuredObject],
) -> Result<bool, ControllerError> {
    let mut all_deleted = true;

    if use_routes {
        let reencrypt = routes::ensure_deleted(cluster, namespace, routes::REENCRYPT_ROUTE).await?;
        let passthrough = routes::ensure_deleted(cluster, namespace, routes::PASSTHROUGH_ROUTE).await?;
        all_deleted = all_deleted && reencrypt && passthrough;
    }

    let central = ensure_central_cr_deleted(cluster, namespace, name).await?;
    all_deleted = all_deleted && central;

    let vpa = vpa::ensure_deleted(cluster, namespace).await?;
    all_deleted = all_deleted && vpa;

    let chart = chart_resources::ensure_deleted(cluster, chart_objects).await?;
    all_deleted = all_deleted && chart;

    let ns = namespace::ensure_deleted(cluster, namespace).await?;
    all_deleted = all_deleted && ns;

    debug!(
        "Deletion pass for {}/{}: routes_enabled={} central={} vpa={} chart={} namespace={}",
        namespace, name, use_routes, central, vpa, chart, ns
    );
    Ok(all_deleted)
}
