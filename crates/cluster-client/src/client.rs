//! kube-rs backed cluster client

use crds::Central;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, DeleteParams, DynamicObject, GroupVersionKind, PostParams};
use kube::{Client, Resource};
use tracing::debug;

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use crate::unstructured::UnstructuredObject;

const ROUTE_API_GROUP: &str = "route.openshift.io";

/// Cluster client talking to the API server through a kube `Client`
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client from in-cluster config or the local kubeconfig
    pub async fn try_default() -> Result<Self, ClusterError> {
        let client = Client::try_default().await.map_err(ClusterError::Kube)?;
        Ok(Self::new(client))
    }

    fn dynamic_api(&self, gvk: &GroupVersionKind, namespace: &str) -> Api<DynamicObject> {
        let ar = kube::api::ApiResource::from_gvk(gvk);
        Api::namespaced_with(self.client.clone(), namespace, &ar)
    }

    fn centrals(&self, namespace: &str) -> Api<Central> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn key(kind: &str, namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        format!("{kind} {name}")
    } else {
        format!("{kind} {namespace}/{name}")
    }
}

fn require_identity<K: Resource>(object: &K, kind: &str) -> Result<(String, String), ClusterError> {
    let meta = object.meta();
    let name = meta
        .name
        .clone()
        .ok_or_else(|| ClusterError::Invalid(format!("{kind} without name")))?;
    Ok((meta.namespace.clone().unwrap_or_default(), name))
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClusterError> {
        debug!("GET Namespace {}", name);
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Namespace", "", name)))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, ClusterError> {
        let (_, name) = require_identity(namespace, "Namespace")?;
        debug!("CREATE Namespace {}", name);
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), namespace)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Namespace", "", &name)))
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        debug!("DELETE Namespace {}", name);
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube(e, key("Namespace", "", name)))
    }

    async fn get_central(&self, namespace: &str, name: &str) -> Result<Central, ClusterError> {
        debug!("GET Central {}/{}", namespace, name);
        self.centrals(namespace)
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Central", namespace, name)))
    }

    async fn create_central(&self, central: &Central) -> Result<Central, ClusterError> {
        let (namespace, name) = require_identity(central, "Central")?;
        debug!("CREATE Central {}/{}", namespace, name);
        self.centrals(&namespace)
            .create(&PostParams::default(), central)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Central", &namespace, &name)))
    }

    async fn update_central(&self, central: &Central) -> Result<Central, ClusterError> {
        let (namespace, name) = require_identity(central, "Central")?;
        debug!("UPDATE Central {}/{}", namespace, name);
        self.centrals(&namespace)
            .replace(&name, &PostParams::default(), central)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Central", &namespace, &name)))
    }

    async fn delete_central(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        debug!("DELETE Central {}/{}", namespace, name);
        self.centrals(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube(e, key("Central", namespace, name)))
    }

    async fn get_object(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<UnstructuredObject, ClusterError> {
        debug!("GET {} {}/{}", gvk.kind, namespace, name);
        let object = self
            .dynamic_api(gvk, namespace)
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, key(&gvk.kind, namespace, name)))?;
        UnstructuredObject::from_dynamic(object)
    }

    async fn create_object(&self, object: &UnstructuredObject) -> Result<UnstructuredObject, ClusterError> {
        let namespace = object.namespace().unwrap_or_default();
        let name = object
            .name()
            .ok_or_else(|| ClusterError::Invalid(format!("{} without name", object.gvk().kind)))?;
        debug!("CREATE {} {}/{}", object.gvk().kind, namespace, name);
        let created = self
            .dynamic_api(object.gvk(), namespace)
            .create(&PostParams::default(), object.object())
            .await
            .map_err(|e| ClusterError::from_kube(e, key(&object.gvk().kind, namespace, name)))?;
        UnstructuredObject::from_dynamic(created)
    }

    async fn delete_object(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterError> {
        debug!("DELETE {} {}/{}", gvk.kind, namespace, name);
        self.dynamic_api(gvk, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube(e, key(&gvk.kind, namespace, name)))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ClusterError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Deployment", namespace, name)))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, key("Secret", namespace, name)))
    }

    async fn routes_supported(&self) -> Result<bool, ClusterError> {
        let groups = self.client.list_api_groups().await.map_err(ClusterError::Kube)?;
        Ok(groups.groups.iter().any(|g| g.name == ROUTE_API_GROUP))
    }
}
