//! Mock FleetManagerClient for unit testing

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crds::{DataPlaneCentralStatus, ManagedCentral, ManagedCentralList};

use crate::error::FleetManagerError;
use crate::fleet_manager_trait::FleetManagerClientTrait;

/// In-memory fleet manager
///
/// Serves whatever centrals were registered with [`MockFleetManagerClient::set_centrals`]
/// and records every status update for later inspection.
#[derive(Debug, Clone, Default)]
pub struct MockFleetManagerClient {
    centrals: Arc<Mutex<Vec<ManagedCentral>>>,
    status_updates: Arc<Mutex<Vec<BTreeMap<String, DataPlaneCentralStatus>>>>,
    fail_list: Arc<Mutex<bool>>,
}

impl MockFleetManagerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the centrals served by `get_managed_centrals` (for test setup)
    pub fn set_centrals(&self, centrals: Vec<ManagedCentral>) {
        *self.centrals.lock().unwrap() = centrals;
    }

    /// Make `get_managed_centrals` fail (for test setup)
    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }

    /// All status updates received so far, oldest first
    pub fn status_updates(&self) -> Vec<BTreeMap<String, DataPlaneCentralStatus>> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FleetManagerClientTrait for MockFleetManagerClient {
    async fn get_managed_centrals(&self) -> Result<ManagedCentralList, FleetManagerError> {
        if *self.fail_list.lock().unwrap() {
            return Err(FleetManagerError::Api("list managed centrals failed: 503".to_string()));
        }
        Ok(ManagedCentralList {
            kind: "ManagedCentralList".to_string(),
            items: self.centrals.lock().unwrap().clone(),
        })
    }

    async fn update_status(
        &self,
        statuses: &BTreeMap<String, DataPlaneCentralStatus>,
    ) -> Result<(), FleetManagerError> {
        self.status_updates.lock().unwrap().push(statuses.clone());
        Ok(())
    }
}
