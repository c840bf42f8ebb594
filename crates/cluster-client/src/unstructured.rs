//! GVK-tagged dynamic objects

use std::collections::BTreeMap;
use std::fmt;

use kube::api::{ApiResource, DynamicObject, GroupVersionKind};

use crate::error::ClusterError;

/// A free-form Kubernetes object that keeps its group/version/kind explicit
///
/// The GVK is what the client dispatches on; the payload outside `metadata`
/// lives in the wrapped `DynamicObject::data`.
#[derive(Debug, Clone)]
pub struct UnstructuredObject {
    gvk: GroupVersionKind,
    object: DynamicObject,
}

impl UnstructuredObject {
    /// Build a namespaced object of kind `gvk` named `name` with `data`
    /// as everything besides `apiVersion`, `kind` and `metadata`.
    pub fn new(gvk: GroupVersionKind, namespace: &str, name: &str, data: serde_json::Value) -> Self {
        let ar = ApiResource::from_gvk(&gvk);
        let object = DynamicObject::new(name, &ar).within(namespace).data(data);
        Self { gvk, object }
    }

    /// Wrap an existing object, reading the GVK from its type meta
    pub fn from_dynamic(object: DynamicObject) -> Result<Self, ClusterError> {
        let types = object
            .types
            .as_ref()
            .ok_or_else(|| ClusterError::Invalid("object has no apiVersion/kind".to_string()))?;
        let gvk = parse_gvk(&types.api_version, &types.kind)?;
        Ok(Self { gvk, object })
    }

    /// Parse a full manifest (`apiVersion`, `kind`, `metadata`, ...)
    pub fn from_value(value: serde_json::Value) -> Result<Self, ClusterError> {
        let object: DynamicObject = serde_json::from_value(value)?;
        Self::from_dynamic(object)
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    pub fn name(&self) -> Option<&str> {
        self.object.metadata.name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.object.metadata.namespace.as_deref()
    }

    /// Put the object into `namespace` unless it already names one
    pub fn default_namespace(&mut self, namespace: &str) {
        if self.namespace().is_none_or(str::is_empty) {
            self.object.metadata.namespace = Some(namespace.to_string());
        }
    }

    pub fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.object.metadata.labels.get_or_insert_with(BTreeMap::new)
    }

    /// Deletion was requested and finalizers are still running
    pub fn is_terminating(&self) -> bool {
        self.object.metadata.deletion_timestamp.is_some()
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.object.data
    }

    pub fn data_mut(&mut self) -> &mut serde_json::Value {
        &mut self.object.data
    }

    pub fn object(&self) -> &DynamicObject {
        &self.object
    }
}

impl fmt::Display for UnstructuredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.gvk.kind,
            self.namespace().unwrap_or_default(),
            self.name().unwrap_or_default()
        )
    }
}

/// Split `apiVersion` into group and version (core group has no slash)
pub fn parse_gvk(api_version: &str, kind: &str) -> Result<GroupVersionKind, ClusterError> {
    if api_version.is_empty() || kind.is_empty() {
        return Err(ClusterError::Invalid(format!(
            "incomplete type meta: apiVersion={api_version:?} kind={kind:?}"
        )));
    }
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    Ok(GroupVersionKind::gvk(group, version, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_keeps_gvk_and_payload() {
        let obj = UnstructuredObject::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "NetworkPolicy",
            "metadata": {"name": "default-deny"},
            "spec": {"podSelector": {}}
        }))
        .unwrap();

        assert_eq!(obj.gvk().group, "networking.k8s.io");
        assert_eq!(obj.gvk().version, "v1");
        assert_eq!(obj.gvk().kind, "NetworkPolicy");
        assert_eq!(obj.name(), Some("default-deny"));
        assert!(obj.namespace().is_none());
        assert!(obj.data().get("spec").is_some());
    }

    #[test]
    fn test_core_group_api_version() {
        let gvk = parse_gvk("v1", "ConfigMap").unwrap();
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
    }

    #[test]
    fn test_missing_kind_is_invalid() {
        let err = UnstructuredObject::from_value(json!({
            "apiVersion": "v1",
            "metadata": {"name": "x"}
        }))
        .unwrap_err();
        assert!(matches!(err, ClusterError::Invalid(_) | ClusterError::Serialization(_)));
    }

    #[test]
    fn test_default_namespace_only_fills_empty() {
        let gvk = GroupVersionKind::gvk("", "v1", "ConfigMap");
        let mut obj = UnstructuredObject::new(gvk.clone(), "", "cm", json!({}));
        obj.default_namespace("tenant");
        assert_eq!(obj.namespace(), Some("tenant"));

        let mut obj = UnstructuredObject::new(gvk, "other", "cm", json!({}));
        obj.default_namespace("tenant");
        assert_eq!(obj.namespace(), Some("other"));
    }
}
