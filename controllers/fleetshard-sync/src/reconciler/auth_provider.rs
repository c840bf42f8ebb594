//! Red Hat SSO auth provider inside a tenant's Central
//!
//! Central exposes its own REST API; the provider and the group granting
//! the owner Admin are created through it with the generated admin password.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cluster_client::ClusterClientTrait;
use crds::ManagedCentral;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::routes::CENTRAL_TLS_SECRET;
use super::status::deployment_ready;
use crate::error::ControllerError;

pub const AUTH_PROVIDER_NAME: &str = "Red Hat SSO";
pub const CENTRAL_HTPASSWD_SECRET: &str = "central-htpasswd";

const ADMIN_USER: &str = "admin";
const PASSWORD_KEY: &str = "password";
const CA_KEY: &str = "ca.pem";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Probe and create the tenant's SSO auth provider
///
/// `exists` answers `false` while Central is not serving yet.
#[async_trait]
pub trait AuthProviderClient: Send + Sync {
    async fn exists(&self, central: &ManagedCentral) -> Result<bool, ControllerError>;

    async fn create(&self, central: &ManagedCentral) -> Result<(), ControllerError>;
}

#[derive(Debug, Deserialize)]
struct AuthProviders {
    #[serde(default, rename = "authProviders")]
    auth_providers: Vec<AuthProvider>,
}

#[derive(Debug, Deserialize)]
struct AuthProvider {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

/// Talks to `https://central.<namespace>.svc` using credentials the
/// operator stored in the tenant namespace
pub struct CentralAuthProviderClient {
    cluster: Arc<dyn ClusterClientTrait>,
}

impl std::fmt::Debug for CentralAuthProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentralAuthProviderClient").finish_non_exhaustive()
    }
}

impl CentralAuthProviderClient {
    pub fn new(cluster: Arc<dyn ClusterClientTrait>) -> Self {
        Self { cluster }
    }

    pub fn central_url(namespace: &str) -> String {
        format!("https://central.{namespace}.svc:443")
    }

    async fn secret_value(&self, namespace: &str, secret: &str, key: &str) -> Result<Vec<u8>, ControllerError> {
        let secret_obj = self
            .cluster
            .get_secret(namespace, secret)
            .await
            .map_err(|e| ControllerError::cluster(format!("getting secret {namespace}/{secret}"), e))?;
        secret_obj
            .data
            .and_then(|mut data| data.remove(key))
            .map(|value| value.0)
            .ok_or_else(|| ControllerError::AuthProvider(format!("secret {namespace}/{secret} has no {key}")))
    }

    async fn http_client(&self, namespace: &str) -> Result<(reqwest::Client, String), ControllerError> {
        let ca = self.secret_value(namespace, CENTRAL_TLS_SECRET, CA_KEY).await?;
        let password = self.secret_value(namespace, CENTRAL_HTPASSWD_SECRET, PASSWORD_KEY).await?;
        let password = String::from_utf8(password)
            .map_err(|e| ControllerError::AuthProvider(format!("admin password is not UTF-8: {e}")))?;

        let certificate = reqwest::Certificate::from_pem(&ca)
            .map_err(|e| ControllerError::AuthProvider(format!("parsing central CA: {e}")))?;
        let client = reqwest::Client::builder()
            .add_root_certificate(certificate)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ControllerError::AuthProvider(format!("building HTTP client: {e}")))?;
        Ok((client, password))
    }
}

fn request_failed(what: &str, e: &reqwest::Error) -> ControllerError {
    ControllerError::AuthProvider(format!("{what}: {e}"))
}

#[async_trait]
impl AuthProviderClient for CentralAuthProviderClient {
    async fn exists(&self, central: &ManagedCentral) -> Result<bool, ControllerError> {
        let namespace = &central.metadata.namespace;
        if !deployment_ready(self.cluster.as_ref(), namespace).await? {
            return Ok(false);
        }
        let (client, password) = self.http_client(namespace).await?;
        let url = format!("{}/v1/authProviders", Self::central_url(namespace));
        debug!("Listing auth providers of {}", central.key());

        let providers: AuthProviders = client
            .get(&url)
            .query(&[("name", AUTH_PROVIDER_NAME)])
            .basic_auth(ADMIN_USER, Some(&password))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| request_failed("listing auth providers", &e))?
            .json()
            .await
            .map_err(|e| request_failed("decoding auth providers", &e))?;

        Ok(providers.auth_providers.iter().any(|p| p.name == AUTH_PROVIDER_NAME))
    }

    async fn create(&self, central: &ManagedCentral) -> Result<(), ControllerError> {
        let namespace = &central.metadata.namespace;
        let (client, password) = self.http_client(namespace).await?;
        let base = Self::central_url(namespace);
        let auth = &central.spec.auth;

        let provider = json!({
            "name": AUTH_PROVIDER_NAME,
            "type": "oidc",
            "uiEndpoint": central.spec.ui_endpoint.host,
            "enabled": true,
            "config": {
                "issuer": auth.issuer,
                "client_id": auth.client_id,
                "client_secret": auth.client_secret,
                "mode": "post",
            },
            "requiredAttributes": [
                {"attributeKey": "rh_org_id", "attributeValue": auth.owner_org_id},
            ],
        });
        let created: AuthProvider = client
            .post(format!("{base}/v1/authProviders"))
            .basic_auth(ADMIN_USER, Some(&password))
            .json(&provider)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| request_failed("creating auth provider", &e))?
            .json()
            .await
            .map_err(|e| request_failed("decoding auth provider", &e))?;

        let group = json!({
            "props": {
                "authProviderId": created.id,
                "key": "userid",
                "value": auth.owner_user_id,
            },
            "roleName": "Admin",
        });
        client
            .post(format!("{base}/v1/groups"))
            .basic_auth(ADMIN_USER, Some(&password))
            .json(&group)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| request_failed("creating admin group", &e))?;

        info!("Created auth provider {} for {}", AUTH_PROVIDER_NAME, central.key());
        Ok(())
    }
}
