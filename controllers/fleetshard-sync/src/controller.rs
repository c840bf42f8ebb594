//! Runtime loop.
//!
//! Polls the fleet manager for the centrals assigned to this cluster, runs
//! one reconciliation pass per central concurrently and reports the collected
//! statuses back in a single update. Each central keeps the same
//! `CentralReconciler` until it reports `Deleted`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use cluster_client::ClusterClientTrait;
use crds::{DataPlaneCentralStatus, ManagedCentral};
use fleet_manager_client::FleetManagerClientTrait;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::backoff::BackoffState;
use crate::error::ControllerError;
use crate::metrics;
use crate::reconciler::auth_provider::AuthProviderClient;
use crate::reconciler::{CentralReconciler, ReconcilerOptions};

type PassResult = Result<DataPlaneCentralStatus, ControllerError>;

/// Drives every central assigned to this cluster.
pub struct Controller {
    fleet_manager: Arc<dyn FleetManagerClientTrait>,
    cluster: Arc<dyn ClusterClientTrait>,
    auth_provider: Arc<dyn AuthProviderClient>,
    options: ReconcilerOptions,
    reconcilers: Mutex<HashMap<String, Arc<CentralReconciler>>>,
    /// Error count tracking per central id
    backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("options", &self.options)
            .field("reconcilers", &self.reconciler_count())
            .finish_non_exhaustive()
    }
}

fn outcome(result: &PassResult) -> &'static str {
    match result {
        Ok(status) if status.is_deleted() => "deleted",
        Ok(status) if status.ready_condition().is_some_and(|c| c.status == "True") => "ready",
        Ok(_) => "installing",
        Err(ControllerError::Busy) => "busy",
        Err(ControllerError::NotChanged) => "not_changed",
        Err(ControllerError::DeletionInProgress) => "deletion_in_progress",
        Err(_) => "error",
    }
}

impl Controller {
    pub fn new(
        fleet_manager: Arc<dyn FleetManagerClientTrait>,
        cluster: Arc<dyn ClusterClientTrait>,
        auth_provider: Arc<dyn AuthProviderClient>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            fleet_manager,
            cluster,
            auth_provider,
            options,
            reconcilers: Mutex::new(HashMap::new()),
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    pub fn reconciler_count(&self) -> usize {
        self.reconcilers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Poll forever; a failed tick is logged and the next one tries again
    pub async fn run(&self, period: Duration) -> Result<(), ControllerError> {
        info!("Starting runtime loop, polling every {:?}", period);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(reported) => debug!("Tick reported {} statuses", reported),
                Err(e) => error!("Runtime tick failed: {}", e),
            }
        }
    }

    /// One poll: fetch, reconcile, report. Returns the number of statuses sent.
    pub async fn tick(&self) -> Result<usize, ControllerError> {
        let list = self.fleet_manager.get_managed_centrals().await?;
        info!("Received {} centrals", list.items.len());
        metrics::set_managed_centrals(list.items.len());

        let due = self.due_centrals(list.items, Instant::now());
        let results = join_all(due.iter().map(|(central, reconciler)| async move {
            let started = Instant::now();
            let result = reconciler.reconcile(central).await;
            metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());
            (central, result)
        }))
        .await;

        let mut statuses = BTreeMap::new();
        for (central, result) in results {
            if let Some(status) = self.handle_result(central, result) {
                statuses.insert(central.id.clone(), status);
            }
        }

        if statuses.is_empty() {
            debug!("No status changes to report");
            return Ok(0);
        }
        self.fleet_manager.update_status(&statuses).await?;
        info!("Reported status of {} centrals", statuses.len());
        Ok(statuses.len())
    }

    /// Centrals whose backoff has elapsed, each paired with its reconciler
    fn due_centrals(
        &self,
        centrals: Vec<ManagedCentral>,
        now: Instant,
    ) -> Vec<(ManagedCentral, Arc<CentralReconciler>)> {
        let backoff_states = self.backoff_states.lock().unwrap_or_else(PoisonError::into_inner);
        let mut reconcilers = self.reconcilers.lock().unwrap_or_else(PoisonError::into_inner);

        centrals
            .into_iter()
            .filter(|central| {
                let due = backoff_states.get(&central.id).is_none_or(|state| state.ready(now));
                if !due {
                    debug!("Central {} is backing off", central.key());
                }
                due
            })
            .map(|central| {
                let reconciler = reconcilers
                    .entry(central.id.clone())
                    .or_insert_with(|| {
                        debug!("New reconciler for central {}", central.key());
                        Arc::new(CentralReconciler::new(
                            Arc::clone(&self.cluster),
                            Arc::clone(&self.auth_provider),
                            self.options.clone(),
                        ))
                    });
                let reconciler = Arc::clone(reconciler);
                (central, reconciler)
            })
            .collect()
    }

    fn handle_result(&self, central: &ManagedCentral, result: PassResult) -> Option<DataPlaneCentralStatus> {
        metrics::increment_reconciliations(outcome(&result));
        let mut backoff_states = self.backoff_states.lock().unwrap_or_else(PoisonError::into_inner);

        match result {
            Ok(status) => {
                backoff_states.remove(&central.id);
                if status.is_deleted() {
                    info!("Central {} deleted, dropping its reconciler", central.key());
                    self.reconcilers
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&central.id);
                }
                Some(status)
            }
            Err(e) if e.is_sentinel() => {
                debug!("Central {}: {}", central.key(), e);
                if let Some(state) = backoff_states.get_mut(&central.id) {
                    state.record_success();
                }
                None
            }
            Err(e) => {
                let state = backoff_states.entry(central.id.clone()).or_default();
                let wait = state.record_failure(Instant::now());
                error!("Failed to reconcile central {}: {}", central.key(), e);
                warn!(
                    "Retrying central {} in {:?} (attempt {})",
                    central.key(),
                    wait,
                    state.error_count()
                );
                None
            }
        }
    }

    #[cfg(test)]
    fn error_count(&self, id: &str) -> u32 {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map_or(0, BackoffState::error_count)
    }
}

/// `USE_ROUTES` when set, otherwise whether the cluster serves routes
pub async fn detect_use_routes(
    forced: Option<bool>,
    cluster: &dyn ClusterClientTrait,
) -> Result<bool, ControllerError> {
    match forced {
        Some(forced) => Ok(forced),
        None => cluster
            .routes_supported()
            .await
            .map_err(|e| ControllerError::cluster("discovering route support", e)),
    }
}
