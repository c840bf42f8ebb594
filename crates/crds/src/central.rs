//! Central CRD
//!
//! Primary resource for one tenant. Reconciled by the StackRox operator
//! running on the data-plane cluster; fleetshard only writes the spec.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Resource quantities keyed by resource name (`cpu`, `memory`, ...)
pub type ResourceList = BTreeMap<String, String>;

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "platform.stackrox.io",
    version = "v1alpha1",
    kind = "Central",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CentralSpec {
    /// Central component settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub central: Option<CentralComponentSpec>,

    /// Scanner component settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerComponentSpec>,

    /// Cluster-wide customizations applied to every workload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customize: Option<CustomizeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CentralComponentSpec {
    /// How Central is exposed outside the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<Exposure>,

    /// Metrics endpoint exposure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<Monitoring>,

    /// Skip generating the admin password (set when an SSO provider exists)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password_generation_disabled: Option<bool>,

    /// Compute resources for the Central deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: ResourceList,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: ResourceList,
}

impl ResourceRequirements {
    /// True when neither requests nor limits carry a value
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<ExposureRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExposureRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Monitoring {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_endpoint: Option<ExposeEndpoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
/// Whether a component publishes its metrics port
pub enum ExposeEndpoint {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScannerComponentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<ScannerAnalyzerComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<ScannerDbComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<Monitoring>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScannerAnalyzerComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<ScannerAnalyzerScaling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScannerDbComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScannerAnalyzerScaling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling: Option<AutoScalingPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
/// Horizontal autoscaling toggle for the scanner analyzer
///
/// Serializes as PascalCase ("Enabled", "Disabled") and also accepts the
/// lowercase spelling used by the fleet manager API.
pub enum AutoScalingPolicy {
    #[serde(alias = "enabled")]
    Enabled,
    #[serde(alias = "disabled")]
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomizeSpec {
    /// Extra environment variables injected into every container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}
