//! Mock ClusterClient for unit testing
//!
//! Stores objects in memory keyed by (namespace, name). Deletes of
//! namespaces leave them in the `Terminating` phase until
//! [`MockClusterClient::finalize_namespace`] is called; every other delete
//! takes effect immediately. Each write is appended to an action log so
//! tests can assert on ordering and on the absence of writes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crds::Central;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::api::core::v1::{Namespace, NamespaceStatus, Secret};
use k8s_openapi::ByteString;
use kube::api::{GroupVersionKind, ObjectMeta};
use kube::Resource;

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::unstructured::UnstructuredObject;

type ObjectKey = (String, String);

fn object_key(gvk: &GroupVersionKind, namespace: &str, name: &str) -> String {
    format!("{}/{}/{} {}/{}", gvk.group, gvk.version, gvk.kind, namespace, name)
}

/// In-memory cluster
#[derive(Debug, Clone)]
pub struct MockClusterClient {
    pub(crate) namespaces: Arc<Mutex<BTreeMap<String, Namespace>>>,
    pub(crate) centrals: Arc<Mutex<BTreeMap<ObjectKey, Central>>>,
    pub(crate) objects: Arc<Mutex<BTreeMap<String, UnstructuredObject>>>,
    pub(crate) deployments: Arc<Mutex<BTreeMap<ObjectKey, Deployment>>>,
    pub(crate) secrets: Arc<Mutex<BTreeMap<ObjectKey, Secret>>>,
    pub(crate) routes_supported: Arc<Mutex<bool>>,
    // Objects whose delete answers NotFound while reads still return them
    pub(crate) stale_reads: Arc<Mutex<BTreeSet<String>>>,
    // Write log: "create Central ns/name", "delete Route ns/name", ...
    pub(crate) actions: Arc<Mutex<Vec<String>>>,
    pub(crate) next_resource_version: Arc<Mutex<u64>>,
}

impl Default for MockClusterClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClusterClient {
    /// Create an empty cluster that serves routes
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(Mutex::new(BTreeMap::new())),
            centrals: Arc::new(Mutex::new(BTreeMap::new())),
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            deployments: Arc::new(Mutex::new(BTreeMap::new())),
            secrets: Arc::new(Mutex::new(BTreeMap::new())),
            routes_supported: Arc::new(Mutex::new(true)),
            stale_reads: Arc::new(Mutex::new(BTreeSet::new())),
            actions: Arc::new(Mutex::new(Vec::new())),
            next_resource_version: Arc::new(Mutex::new(1)),
        }
    }

    /// All writes so far, oldest first
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    /// Number of create/update/delete calls so far
    pub fn write_calls(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    pub fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    pub fn set_routes_supported(&self, supported: bool) {
        *self.routes_supported.lock().unwrap() = supported;
    }

    /// Make deletes of this object fail with NotFound while reads keep
    /// returning it, as when a stale cache races a concurrent delete
    pub fn set_delete_not_found(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) {
        self.stale_reads.lock().unwrap().insert(object_key(gvk, namespace, name));
    }

    /// Install a deployment whose status reports ready or not (for test setup)
    pub fn set_deployment_ready(&self, namespace: &str, name: &str, ready: bool) {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            status: Some(DeploymentStatus {
                available_replicas: Some(i32::from(ready)),
                unavailable_replicas: if ready { None } else { Some(1) },
                ..Default::default()
            }),
            ..Default::default()
        };
        self.deployments
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), deployment);
    }

    /// Install a secret with the given data keys (for test setup)
    pub fn add_secret(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect(),
            ),
            ..Default::default()
        };
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), secret);
    }

    /// Put an object into the store without logging a write (for test setup)
    pub fn insert_object(&self, object: UnstructuredObject) {
        let key = object_key(
            object.gvk(),
            object.namespace().unwrap_or_default(),
            object.name().unwrap_or_default(),
        );
        self.objects.lock().unwrap().insert(key, object);
    }

    /// Put a Central into the store without logging a write (for test setup)
    pub fn insert_central(&self, central: Central) {
        let namespace = central.meta().namespace.clone().unwrap_or_default();
        let name = central.meta().name.clone().unwrap_or_default();
        self.centrals.lock().unwrap().insert((namespace, name), central);
    }

    /// Drop a namespace that was left terminating by `delete_namespace`
    pub fn finalize_namespace(&self, name: &str) {
        self.namespaces.lock().unwrap().remove(name);
    }

    /// Mark a route admitted by `router` so status lookups find an ingress
    pub fn admit_route(&self, namespace: &str, name: &str, router: &str) {
        let mut objects = self.objects.lock().unwrap();
        for object in objects.values_mut() {
            if object.gvk().kind == "Route"
                && object.namespace() == Some(namespace)
                && object.name() == Some(name)
            {
                let host = object
                    .data()
                    .pointer("/spec/host")
                    .and_then(|h| h.as_str())
                    .unwrap_or_default()
                    .to_string();
                object.data_mut()["status"] = serde_json::json!({
                    "ingress": [{
                        "host": host,
                        "routerCanonicalHostname": router,
                        "conditions": [{"type": "Admitted", "status": "True"}]
                    }]
                });
            }
        }
    }

    pub fn has_object(&self, gvk: &GroupVersionKind, namespace: &str, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&object_key(gvk, namespace, name))
    }

    pub fn central(&self, namespace: &str, name: &str) -> Option<Central> {
        self.centrals
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn namespace_phase(&self, name: &str) -> Option<String> {
        self.namespaces
            .lock()
            .unwrap()
            .get(name)
            .map(|ns| ns.status.as_ref().and_then(|s| s.phase.clone()).unwrap_or_default())
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn bump_resource_version(&self, meta: &mut ObjectMeta) {
        let mut next = self.next_resource_version.lock().unwrap();
        meta.resource_version = Some(next.to_string());
        *next += 1;
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClusterError> {
        self.namespaces
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Namespace {name}")))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, ClusterError> {
        let name = namespace
            .metadata
            .name
            .clone()
            .ok_or_else(|| ClusterError::Invalid("Namespace without name".to_string()))?;
        let mut namespaces = self.namespaces.lock().unwrap();
        if namespaces.contains_key(&name) {
            return Err(ClusterError::AlreadyExists(format!("Namespace {name}")));
        }
        let mut created = namespace.clone();
        created.status = Some(NamespaceStatus {
            phase: Some("Active".to_string()),
            ..Default::default()
        });
        namespaces.insert(name.clone(), created.clone());
        drop(namespaces);
        self.record(format!("create Namespace {name}"));
        Ok(created)
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let mut namespaces = self.namespaces.lock().unwrap();
        let namespace = namespaces
            .get_mut(name)
            .ok_or_else(|| ClusterError::NotFound(format!("Namespace {name}")))?;
        namespace.status = Some(NamespaceStatus {
            phase: Some("Terminating".to_string()),
            ..Default::default()
        });
        drop(namespaces);
        self.record(format!("delete Namespace {name}"));
        Ok(())
    }

    async fn get_central(&self, namespace: &str, name: &str) -> Result<Central, ClusterError> {
        self.central(namespace, name)
            .ok_or_else(|| ClusterError::NotFound(format!("Central {namespace}/{name}")))
    }

    async fn create_central(&self, central: &Central) -> Result<Central, ClusterError> {
        let namespace = central.meta().namespace.clone().unwrap_or_default();
        let name = central
            .meta()
            .name
            .clone()
            .ok_or_else(|| ClusterError::Invalid("Central without name".to_string()))?;
        let key = (namespace.clone(), name.clone());
        if self.centrals.lock().unwrap().contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!("Central {namespace}/{name}")));
        }
        let mut created = central.clone();
        self.bump_resource_version(&mut created.metadata);
        self.centrals.lock().unwrap().insert(key, created.clone());
        self.record(format!("create Central {namespace}/{name}"));
        Ok(created)
    }

    async fn update_central(&self, central: &Central) -> Result<Central, ClusterError> {
        let namespace = central.meta().namespace.clone().unwrap_or_default();
        let name = central.meta().name.clone().unwrap_or_default();
        let key = (namespace.clone(), name.clone());
        if !self.centrals.lock().unwrap().contains_key(&key) {
            return Err(ClusterError::NotFound(format!("Central {namespace}/{name}")));
        }
        let mut updated = central.clone();
        self.bump_resource_version(&mut updated.metadata);
        self.centrals.lock().unwrap().insert(key, updated.clone());
        self.record(format!("update Central {namespace}/{name}"));
        Ok(updated)
    }

    async fn delete_central(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.centrals
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClusterError::NotFound(format!("Central {namespace}/{name}")))?;
        self.record(format!("delete Central {namespace}/{name}"));
        Ok(())
    }

    async fn get_object(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<UnstructuredObject, ClusterError> {
        self.objects
            .lock()
            .unwrap()
            .get(&object_key(gvk, namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("{} {namespace}/{name}", gvk.kind)))
    }

    async fn create_object(&self, object: &UnstructuredObject) -> Result<UnstructuredObject, ClusterError> {
        let namespace = object.namespace().unwrap_or_default().to_string();
        let name = object
            .name()
            .ok_or_else(|| ClusterError::Invalid(format!("{} without name", object.gvk().kind)))?
            .to_string();
        let key = object_key(object.gvk(), &namespace, &name);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!(
                "{} {namespace}/{name}",
                object.gvk().kind
            )));
        }
        objects.insert(key, object.clone());
        drop(objects);
        self.record(format!("create {} {namespace}/{name}", object.gvk().kind));
        Ok(object.clone())
    }

    async fn delete_object(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterError> {
        let key = object_key(gvk, namespace, name);
        if self.stale_reads.lock().unwrap().contains(&key) {
            return Err(ClusterError::NotFound(format!("{} {namespace}/{name}", gvk.kind)));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(&key)
            .ok_or_else(|| ClusterError::NotFound(format!("{} {namespace}/{name}", gvk.kind)))?;
        self.record(format!("delete {} {namespace}/{name}", gvk.kind));
        Ok(())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Deployment {namespace}/{name}")))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("Secret {namespace}/{name}")))
    }

    async fn routes_supported(&self) -> Result<bool, ClusterError> {
        Ok(*self.routes_supported.lock().unwrap())
    }
}
