//! Fleetshard Synchronizer
//!
//! Data-plane agent for managed Central tenants:
//! - Polls the fleet manager for the centrals assigned to this cluster
//! - Converges each central's namespace, Central CR, routes, VPA and
//!   auxiliary resources onto the cluster
//! - Reports readiness and route status back to the fleet manager
//!
//! A health check and metrics server runs alongside the runtime loop.

mod backoff;
mod charts;
mod config;
mod controller;
mod error;
mod health;
mod metrics;
mod reconciler;
#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use cluster_client::{ClusterClientTrait, KubeClusterClient};
use fleet_manager_client::FleetManagerClient;
use tracing::info;

use crate::config::Config;
use crate::controller::Controller;
use crate::error::ControllerError;
use crate::health::HealthState;
use crate::reconciler::ReconcilerOptions;
use crate::reconciler::auth_provider::CentralAuthProviderClient;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| ControllerError::InvalidConfig("failed to install rustls crypto provider".to_string()))?;

    info!("Starting Fleetshard Synchronizer");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Cluster ID: {}", config.cluster_id);
    info!("  Fleet manager: {}", config.fleet_manager_endpoint);
    info!("  Poll period: {:?}", config.poll_period);
    info!("  Create auth provider: {}", config.create_auth_provider);

    metrics::register_metrics()
        .map_err(|e| ControllerError::InvalidConfig(format!("registering metrics: {e}")))?;

    let cluster: Arc<dyn ClusterClientTrait> = Arc::new(
        KubeClusterClient::try_default()
            .await
            .map_err(|e| ControllerError::cluster("creating Kubernetes client", e))?,
    );
    let use_routes = controller::detect_use_routes(config.use_routes, cluster.as_ref()).await?;
    info!("  Use routes: {}", use_routes);

    let fleet_manager = FleetManagerClient::new(
        config.fleet_manager_endpoint.clone(),
        config.cluster_id.clone(),
        config.fleet_manager_token.clone(),
    )?;
    let auth_provider = Arc::new(CentralAuthProviderClient::new(Arc::clone(&cluster)));

    let controller = Controller::new(
        Arc::new(fleet_manager),
        cluster,
        auth_provider,
        ReconcilerOptions {
            use_routes,
            wants_auth_provider: config.create_auth_provider,
            egress_proxy_image: config.egress_proxy_image.clone(),
        },
    );

    let health_state = Arc::new(HealthState::default());
    tokio::select! {
        result = health::serve(config.health_check_address, health_state) => result,
        result = controller.run(config.poll_period) => result,
    }
}
