//! Status reported back to the fleet manager

use cluster_client::ClusterClientTrait;
use crds::{CONDITION_TYPE_READY, DataPlaneCentralStatus, StatusCondition};
use tracing::debug;

use crate::error::ControllerError;

pub const CENTRAL_DEPLOYMENT: &str = "central";

fn ready_condition(status: &str, reason: Option<&str>) -> DataPlaneCentralStatus {
    DataPlaneCentralStatus {
        conditions: vec![StatusCondition {
            type_: CONDITION_TYPE_READY.to_string(),
            status: status.to_string(),
            reason: reason.map(str::to_string),
            message: None,
        }],
        routes: Vec::new(),
    }
}

pub fn ready() -> DataPlaneCentralStatus {
    ready_condition("True", None)
}

pub fn installing() -> DataPlaneCentralStatus {
    ready_condition("False", Some("Installing"))
}

pub fn deleted() -> DataPlaneCentralStatus {
    ready_condition("False", Some("Deleted"))
}

/// The Central deployment has available replicas and none unavailable.
/// A deployment that does not exist yet is simply not ready.
pub async fn deployment_ready(cluster: &dyn ClusterClientTrait, namespace: &str) -> Result<bool, ControllerError> {
    let deployment = match cluster.get_deployment(namespace, CENTRAL_DEPLOYMENT).await {
        Ok(deployment) => deployment,
        Err(e) if e.is_not_found() => {
            debug!("Deployment {}/{} not found", namespace, CENTRAL_DEPLOYMENT);
            return Ok(false);
        }
        Err(e) => {
            return Err(ControllerError::cluster(
                format!("retrieving deployment {namespace}/{CENTRAL_DEPLOYMENT}"),
                e,
            ));
        }
    };
    let Some(status) = deployment.status else {
        return Ok(false);
    };
    Ok(status.available_replicas.unwrap_or(0) > 0 && status.unavailable_replicas.unwrap_or(0) == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_client::MockClusterClient;

    #[test]
    fn test_status_constructors() {
        assert_eq!(ready().ready_condition().map(|c| c.status.as_str()), Some("True"));
        assert!(!installing().is_deleted());
        assert!(deleted().is_deleted());
        assert_eq!(
            installing().ready_condition().and_then(|c| c.reason.as_deref()),
            Some("Installing")
        );
    }

    #[tokio::test]
    async fn test_deployment_ready() {
        let cluster = MockClusterClient::new();
        assert!(!deployment_ready(&cluster, "rhacs-abc").await.unwrap());

        cluster.set_deployment_ready("rhacs-abc", CENTRAL_DEPLOYMENT, false);
        assert!(!deployment_ready(&cluster, "rhacs-abc").await.unwrap());

        cluster.set_deployment_ready("rhacs-abc", CENTRAL_DEPLOYMENT, true);
        assert!(deployment_ready(&cluster, "rhacs-abc").await.unwrap());
    }
}
