//! ManagedCentral
//!
//! Desired state of one tenant as served by the fleet manager's private
//! agent-cluster API. Read-only on the data plane.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle status strings used by the fleet manager
pub const REQUEST_STATUS_PROVISIONING: &str = "provisioning";
pub const REQUEST_STATUS_READY: &str = "ready";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCentralList {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<ManagedCentral>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCentral {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ManagedCentralMetadata,
    #[serde(default)]
    pub spec: ManagedCentralSpec,
    /// Lifecycle status string, see [`RequestStatus`]
    #[serde(default)]
    pub request_status: String,
}

impl ManagedCentral {
    /// Tenant is being torn down
    pub fn is_deleting(&self) -> bool {
        self.metadata
            .deletion_timestamp
            .as_deref()
            .is_some_and(|ts| !ts.is_empty())
    }

    pub fn request_status(&self) -> RequestStatus {
        RequestStatus::from(self.request_status.as_str())
    }

    /// `namespace/name` for log messages
    pub fn key(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCentralMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Set (non-empty) once the tenant has been marked for deletion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCentralSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    #[serde(default)]
    pub auth: AuthSpec,
    #[serde(default)]
    pub ui_endpoint: EndpointSpec,
    #[serde(default)]
    pub data_endpoint: EndpointSpec,
    #[serde(default)]
    pub central: ManagedCentralComponent,
    #[serde(default)]
    pub scanner: ManagedScannerComponent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSpec {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub owner_user_id: String,
    #[serde(default)]
    pub owner_org_id: String,
    #[serde(default)]
    pub issuer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    #[serde(default)]
    pub host: String,
}

/// Requests and limits as sent by the fleet manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResources {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

impl ManagedResources {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCentralComponent {
    #[serde(default)]
    pub resources: ManagedResources,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedScannerComponent {
    #[serde(default)]
    pub analyzer: ManagedScannerAnalyzer,
    #[serde(default)]
    pub db: ManagedScannerDb,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedScannerAnalyzer {
    #[serde(default)]
    pub resources: ManagedResources,
    #[serde(default)]
    pub scaling: ManagedScaling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedScannerDb {
    #[serde(default)]
    pub resources: ManagedResources,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedScaling {
    /// "enabled" or "disabled"; empty leaves the operator default
    #[serde(default)]
    pub auto_scaling: String,
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub min_replicas: i32,
    #[serde(default)]
    pub max_replicas: i32,
}

/// Coarse lifecycle of a tenant as tracked by the fleet manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    Provisioning,
    Ready,
    Other(String),
}

impl From<&str> for RequestStatus {
    fn from(value: &str) -> Self {
        match value {
            REQUEST_STATUS_PROVISIONING => Self::Provisioning,
            REQUEST_STATUS_READY => Self::Ready,
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_private_api_payload() {
        let raw = r#"{
            "id": "cb45idheg5ip6dq1jo4g",
            "kind": "ManagedCentral",
            "metadata": {
                "name": "acs-tenant",
                "namespace": "rhacs-cb45idheg5ip6dq1jo4g",
                "deletionTimestamp": "2023-01-02T15:04:05Z"
            },
            "spec": {
                "uiEndpoint": {"host": "acs-tenant.example.com"},
                "central": {"resources": {"limits": {"cpu": "2"}}},
                "scanner": {"analyzer": {"scaling": {"autoScaling": "enabled", "minReplicas": 1}}}
            },
            "requestStatus": "provisioning"
        }"#;

        let central: ManagedCentral = serde_json::from_str(raw).unwrap();
        assert!(central.is_deleting());
        assert_eq!(central.request_status(), RequestStatus::Provisioning);
        assert_eq!(central.key(), "rhacs-cb45idheg5ip6dq1jo4g/acs-tenant");
        assert_eq!(central.spec.central.resources.limits.get("cpu").map(String::as_str), Some("2"));
        assert_eq!(central.spec.scanner.analyzer.scaling.min_replicas, 1);
        assert!(central.spec.data_endpoint.host.is_empty());
    }

    #[test]
    fn test_empty_deletion_timestamp_is_not_deleting() {
        let mut central = ManagedCentral::default();
        assert!(!central.is_deleting());
        central.metadata.deletion_timestamp = Some(String::new());
        assert!(!central.is_deleting());
    }

    #[test]
    fn test_unknown_request_status() {
        assert_eq!(RequestStatus::from("ready"), RequestStatus::Ready);
        assert_eq!(
            RequestStatus::from("deprovision"),
            RequestStatus::Other("deprovision".to_string())
        );
    }
}
