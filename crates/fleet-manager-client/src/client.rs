//! Fleet manager HTTP client
//!
//! Private API layout:
//! - `GET  /api/rhacs/v1/agent-clusters/{cluster_id}/centrals`
//! - `PUT  /api/rhacs/v1/agent-clusters/{cluster_id}/centrals/status`

use std::collections::BTreeMap;
use std::time::Duration;

use crds::{DataPlaneCentralStatus, ManagedCentralList};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::error::FleetManagerError;
use crate::fleet_manager_trait::FleetManagerClientTrait;

const PRIVATE_API_PREFIX: &str = "/api/rhacs/v1/agent-clusters";

/// Fleet manager API client authenticated with a static bearer token
#[derive(Debug, Clone)]
pub struct FleetManagerClient {
    client: Client,
    endpoint: String,
    cluster_id: String,
    token: String,
}

impl FleetManagerClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `endpoint` - fleet manager base URL (e.g., "http://127.0.0.1:8000")
    /// * `cluster_id` - id of the data-plane cluster this process serves
    /// * `token` - static bearer token
    pub fn new(endpoint: String, cluster_id: String, token: String) -> Result<Self, FleetManagerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            cluster_id,
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn centrals_url(&self) -> String {
        format!("{}{}/{}/centrals", self.endpoint, PRIVATE_API_PREFIX, self.cluster_id)
    }

    pub fn status_url(&self) -> String {
        format!("{}/status", self.centrals_url())
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(response: Response, what: &str) -> Result<Response, FleetManagerError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(FleetManagerError::Authentication(format!("{what}: {status} - {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FleetManagerError::Api(format!("{what} failed: {status} - {body}")));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl FleetManagerClientTrait for FleetManagerClient {
    async fn get_managed_centrals(&self) -> Result<ManagedCentralList, FleetManagerError> {
        let url = self.centrals_url();
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = Self::check(response, "list managed centrals").await?;

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn update_status(
        &self,
        statuses: &BTreeMap<String, DataPlaneCentralStatus>,
    ) -> Result<(), FleetManagerError> {
        let url = self.status_url();
        debug!("PUT {} ({} statuses)", url, statuses.len());

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(statuses)
            .send()
            .await?;
        Self::check(response, "update central statuses").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = FleetManagerClient::new(
            "http://fleet-manager:8000/".to_string(),
            "c1".to_string(),
            "t".to_string(),
        )
        .unwrap();

        assert_eq!(client.endpoint(), "http://fleet-manager:8000");
        assert_eq!(
            client.centrals_url(),
            "http://fleet-manager:8000/api/rhacs/v1/agent-clusters/c1/centrals"
        );
        assert_eq!(
            client.status_url(),
            "http://fleet-manager:8000/api/rhacs/v1/agent-clusters/c1/centrals/status"
        );
    }
}
