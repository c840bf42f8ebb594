//! Integration tests for the fleet manager client
//!
//! These tests require a running fleet manager.
//! Set FLEET_MANAGER_ENDPOINT, CLUSTER_ID and FLEET_MANAGER_TOKEN to run.

use std::collections::BTreeMap;

use fleet_manager_client::{FleetManagerClient, FleetManagerClientTrait};

fn client_from_env() -> FleetManagerClient {
    let endpoint = std::env::var("FLEET_MANAGER_ENDPOINT")
        .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let cluster_id = std::env::var("CLUSTER_ID").expect("CLUSTER_ID environment variable must be set");
    let token = std::env::var("FLEET_MANAGER_TOKEN")
        .expect("FLEET_MANAGER_TOKEN environment variable must be set");

    FleetManagerClient::new(endpoint, cluster_id, token).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires running fleet manager
async fn test_list_managed_centrals() {
    let client = client_from_env();

    let list = client.get_managed_centrals().await.expect("Failed to list centrals");

    println!("Found {} managed centrals", list.items.len());
}

#[tokio::test]
#[ignore]
async fn test_empty_status_update() {
    let client = client_from_env();

    client
        .update_status(&BTreeMap::new())
        .await
        .expect("Failed to send empty status update");
}
