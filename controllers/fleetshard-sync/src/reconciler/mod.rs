//! Per-central convergence engine.
//!
//! One [`CentralReconciler`] serves one central for its whole lifetime. Each
//! call to [`CentralReconciler::reconcile`] re-reads the cluster, converges it
//! one step at a time and reports the resulting status. Nothing is retried
//! inside a call; the caller re-invokes later and every step is idempotent.
//!
//! - `guard`: single-flight flag
//! - `fingerprint`: change detection over the desired state
//! - `revision`: update counter kept on the Central CR
//! - `resources`: target Central built from the desired state
//! - `namespace`, `chart_resources`, `vpa`, `routes`: per-kind convergers
//! - `deletion`: ordered teardown
//! - `auth_provider`: SSO auth provider inside the tenant's Central
//! - `status`: readiness probe and reported status

pub mod auth_provider;
pub mod chart_resources;
pub mod deletion;
pub mod fingerprint;
pub mod guard;
pub mod namespace;
pub mod resources;
pub mod revision;
pub mod routes;
pub mod status;
pub mod vpa;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cluster_client::ClusterClientTrait;
use crds::{DataPlaneCentralStatus, ManagedCentral, RequestStatus};
use tracing::{debug, info};

use crate::charts::{self, Chart};
use crate::error::ControllerError;
use auth_provider::AuthProviderClient;
use fingerprint::FingerprintCache;
use guard::ConcurrencyGuard;

/// Static behavior shared by every reconciler of a runtime
#[derive(Debug, Clone, Default)]
pub struct ReconcilerOptions {
    /// Expose Central through OpenShift routes
    pub use_routes: bool,
    /// Set up the Red Hat SSO auth provider once Central is ready
    pub wants_auth_provider: bool,
    /// Overrides the egress proxy image of the tenant resources chart
    pub egress_proxy_image: String,
}

/// Reconciles one managed central
///
/// Cross-call state is limited to the single-flight flag, the fingerprint of
/// the last fully successful pass and whether the auth provider is known to
/// exist. The fingerprint only changes at the very end of a successful pass;
/// the auth provider flag only after a successful probe or creation.
pub struct CentralReconciler {
    cluster: Arc<dyn ClusterClientTrait>,
    auth_provider: Arc<dyn AuthProviderClient>,
    options: ReconcilerOptions,
    chart: Chart,
    guard: ConcurrencyGuard,
    fingerprints: FingerprintCache,
    has_auth_provider: AtomicBool,
}

impl std::fmt::Debug for CentralReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentralReconciler")
            .field("options", &self.options)
            .field("chart", &self.chart.name())
            .field("busy", &self.guard.is_blocked())
            .field("has_auth_provider", &self.has_auth_provider())
            .finish_non_exhaustive()
    }
}

impl CentralReconciler {
    pub fn new(
        cluster: Arc<dyn ClusterClientTrait>,
        auth_provider: Arc<dyn AuthProviderClient>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            cluster,
            auth_provider,
            options,
            chart: charts::tenant_resources(),
            guard: ConcurrencyGuard::default(),
            fingerprints: FingerprintCache::default(),
            has_auth_provider: AtomicBool::new(false),
        }
    }

    pub fn has_auth_provider(&self) -> bool {
        self.has_auth_provider.load(Ordering::Acquire)
    }

    fn cluster(&self) -> &dyn ClusterClientTrait {
        self.cluster.as_ref()
    }

    /// Run one reconciliation pass for `desired`.
    ///
    /// Besides a status this returns one of three sentinel errors: `Busy`
    /// when another pass is in flight, `NotChanged` when there is nothing to
    /// do and `DeletionInProgress` while teardown has not been confirmed.
    /// None of them is a failure; the caller simply tries again later.
    pub async fn reconcile(&self, desired: &ManagedCentral) -> Result<DataPlaneCentralStatus, ControllerError> {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!("Reconciliation of {} already in flight", desired.key());
            return Err(ControllerError::Busy);
        };

        let fingerprint = fingerprint::compute(desired)?;
        let changed = self.fingerprints.changed(&fingerprint);
        let request_status = desired.request_status();

        if !changed
            && self.options.wants_auth_provider == self.has_auth_provider()
            && request_status == RequestStatus::Ready
        {
            return Err(ControllerError::NotChanged);
        }

        let namespace = desired.metadata.namespace.as_str();
        let name = desired.metadata.name.as_str();
        let mut central = resources::build_central(desired, self.options.use_routes)?;

        // The provider may have been created by an earlier process
        if self.options.wants_auth_provider && !self.has_auth_provider() && self.auth_provider.exists(desired).await? {
            info!("Auth provider for {}/{} already exists", namespace, name);
            self.has_auth_provider.store(true, Ordering::Release);
        }
        if self.has_auth_provider() {
            central
                .spec
                .central
                .get_or_insert_with(Default::default)
                .admin_password_generation_disabled = Some(true);
        }

        if desired.is_deleting() {
            let objects = chart_resources::render(&self.chart, namespace, &self.options.egress_proxy_image)?;
            let deleted =
                deletion::ensure_deleted(self.cluster(), namespace, name, self.options.use_routes, &objects).await?;
            if deleted {
                info!("Central {}/{} deleted", namespace, name);
                return Ok(status::deleted());
            }
            return Err(ControllerError::DeletionInProgress);
        }

        namespace::ensure_exists(self.cluster(), namespace).await?;

        let objects = chart_resources::render(&self.chart, namespace, &self.options.egress_proxy_image)?;
        chart_resources::ensure_exist(self.cluster(), &objects).await?;

        self.apply_central(desired, central).await?;

        let mut tls_secret_found = true;
        if self.options.use_routes {
            match routes::ensure_exist(self.cluster(), desired).await {
                Ok(()) => {}
                Err(ControllerError::CentralTlsSecretNotFound(_)) => {
                    debug!("Central TLS secret not yet present in {}", namespace);
                    tls_secret_found = false;
                }
                Err(e) => return Err(e),
            }
        }

        let ready = status::deployment_ready(self.cluster(), namespace).await?;
        if !ready || !tls_secret_found {
            if request_status == RequestStatus::Provisioning && !changed {
                return Err(ControllerError::NotChanged);
            }
            return Ok(status::installing());
        }

        if self.options.wants_auth_provider && !self.has_auth_provider() && request_status != RequestStatus::Ready {
            self.auth_provider.create(desired).await?;
            self.has_auth_provider.store(true, Ordering::Release);
        }

        let mut reported = status::ready();
        // Routes were reported already once the fleet manager considers the central ready
        if self.options.use_routes && request_status != RequestStatus::Ready {
            reported.routes = routes::statuses(self.cluster(), namespace).await?;
        }

        self.fingerprints.record(fingerprint);
        Ok(reported)
    }

    /// Create the Central CR or copy the target spec over the existing one
    async fn apply_central(&self, desired: &ManagedCentral, mut central: crds::Central) -> Result<(), ControllerError> {
        let namespace = desired.metadata.namespace.as_str();
        let name = desired.metadata.name.as_str();

        match self.cluster().get_central(namespace, name).await {
            Err(e) if e.is_not_found() => {
                revision::initialize(&mut central);
                info!("Creating central {}/{}", namespace, name);
                self.cluster()
                    .create_central(&central)
                    .await
                    .map_err(|e| ControllerError::cluster(format!("creating new central {namespace}/{name}"), e))?;
                info!(
                    "Central {}/{} created at revision {}",
                    namespace,
                    name,
                    revision::current(&central).unwrap_or_default()
                );

                if resources::wants_autoscaling(desired) {
                    vpa::ensure_exists(self.cluster(), namespace).await?;
                }
            }
            Err(e) => {
                return Err(ControllerError::cluster(
                    format!("unable to check the existence of central {namespace}/{name}"),
                    e,
                ));
            }
            Ok(mut existing) => {
                existing.spec = central.spec;
                let revision = revision::increment(&mut existing)?;
                info!("Update central {}/{} to revision {}", namespace, name, revision);
                self.cluster()
                    .update_central(&existing)
                    .await
                    .map_err(|e| ControllerError::cluster(format!("updating central {namespace}/{name}"), e))?;

                if resources::wants_autoscaling(desired) {
                    vpa::ensure_exists(self.cluster(), namespace).await?;
                } else {
                    vpa::ensure_deleted(self.cluster(), namespace).await?;
                }
            }
        }
        Ok(())
    }
}
