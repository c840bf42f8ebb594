//! Test utilities for unit testing the reconciler and the runtime
//!
//! Desired-state builders plus an in-memory auth provider client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cluster_client::MockClusterClient;
use crds::{
    AuthSpec, EndpointSpec, ManagedCentral, ManagedCentralMetadata, ManagedCentralSpec,
    REQUEST_STATUS_PROVISIONING, REQUEST_STATUS_READY,
};

use crate::error::ControllerError;
use crate::reconciler::auth_provider::AuthProviderClient;
use crate::reconciler::routes::CENTRAL_TLS_SECRET;
use crate::reconciler::{CentralReconciler, ReconcilerOptions};

/// Desired state of a provisioning central `central-<id>` in `rhacs-<id>`
pub fn managed_central(id: &str) -> ManagedCentral {
    ManagedCentral {
        id: id.to_string(),
        kind: "ManagedCentral".to_string(),
        metadata: ManagedCentralMetadata {
            name: format!("central-{id}"),
            namespace: format!("rhacs-{id}"),
            ..Default::default()
        },
        spec: ManagedCentralSpec {
            owners: vec!["owner@example.com".to_string()],
            auth: AuthSpec {
                client_id: format!("client-{id}"),
                client_secret: "secret".to_string(),
                owner_user_id: "user-1".to_string(),
                owner_org_id: "org-1".to_string(),
                issuer: "https://sso.example.com/auth/realms/rhacs".to_string(),
            },
            ui_endpoint: EndpointSpec {
                host: format!("acs-{id}.example.com"),
            },
            data_endpoint: EndpointSpec {
                host: format!("acs-data-{id}.example.com"),
            },
            ..Default::default()
        },
        request_status: REQUEST_STATUS_PROVISIONING.to_string(),
    }
}

/// Same central, already reported ready by the fleet manager
pub fn ready_central(id: &str) -> ManagedCentral {
    let mut central = managed_central(id);
    central.request_status = REQUEST_STATUS_READY.to_string();
    central
}

/// Same central, marked for deletion
pub fn deleting_central(id: &str) -> ManagedCentral {
    let mut central = managed_central(id);
    central.metadata.deletion_timestamp = Some("2024-01-01T00:00:00Z".to_string());
    central
}

/// Make the cluster look like the operator brought Central up
pub fn central_running(cluster: &MockClusterClient, namespace: &str) {
    cluster.add_secret(namespace, CENTRAL_TLS_SECRET, &[("ca.pem", "CA")]);
    cluster.set_deployment_ready(namespace, "central", true);
}

/// Auth provider client that only counts calls
#[derive(Debug, Default)]
pub struct MockAuthProviderClient {
    exists: AtomicBool,
    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MockAuthProviderClient {
    pub fn set_exists(&self, exists: bool) {
        self.exists.store(exists, Ordering::SeqCst);
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProviderClient for MockAuthProviderClient {
    async fn exists(&self, _central: &ManagedCentral) -> Result<bool, ControllerError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.exists.load(Ordering::SeqCst))
    }

    async fn create(&self, _central: &ManagedCentral) -> Result<(), ControllerError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.exists.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Reconciler backed by mocks; the returned handles observe the same state
pub fn reconciler(
    options: ReconcilerOptions,
) -> (CentralReconciler, MockClusterClient, Arc<MockAuthProviderClient>) {
    let cluster = MockClusterClient::new();
    let auth = Arc::new(MockAuthProviderClient::default());
    let auth_client = Arc::clone(&auth);
    let reconciler = CentralReconciler::new(Arc::new(cluster.clone()), auth_client, options);
    (reconciler, cluster, auth)
}

pub fn route_options() -> ReconcilerOptions {
    ReconcilerOptions {
        use_routes: true,
        ..Default::default()
    }
}
