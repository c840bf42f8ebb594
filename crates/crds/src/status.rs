//! Data-plane status reported to the fleet manager

use serde::{Deserialize, Serialize};

pub const CONDITION_TYPE_READY: &str = "Ready";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPlaneCentralStatus {
    #[serde(default)]
    pub conditions: Vec<StatusCondition>,
    /// Hostnames and router identity of the exposed routes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteStatus>,
}

impl DataPlaneCentralStatus {
    pub fn ready_condition(&self) -> Option<&StatusCondition> {
        self.conditions.iter().find(|c| c.type_ == CONDITION_TYPE_READY)
    }

    /// Ready condition with reason `Deleted`
    pub fn is_deleted(&self) -> bool {
        self.ready_condition()
            .is_some_and(|c| c.reason.as_deref() == Some("Deleted"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    pub domain: String,
    pub router: String,
}
