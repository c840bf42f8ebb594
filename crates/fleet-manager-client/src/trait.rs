//! FleetManagerClient trait for mocking

use std::collections::BTreeMap;

use crds::{DataPlaneCentralStatus, ManagedCentralList};

use crate::error::FleetManagerError;

/// Operations the data plane needs from the fleet manager
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait FleetManagerClientTrait: Send + Sync {
    /// Desired state of every central assigned to this cluster
    async fn get_managed_centrals(&self) -> Result<ManagedCentralList, FleetManagerError>;

    /// Report observed statuses, keyed by central id
    async fn update_status(
        &self,
        statuses: &BTreeMap<String, DataPlaneCentralStatus>,
    ) -> Result<(), FleetManagerError>;
}
