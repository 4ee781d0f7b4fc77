//! Cluster-backed [`ObjectStore`] implementation
//!
//! All Kubernetes API traffic lives here; the reconciliation logic itself
//! never touches a [`kube::Client`].

use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams, PostParams};
use kube::core::GroupVersionKind;
use kube::{discovery, Client};
use serde_json::{json, Value};

use dvpa_lib::{
    DynamicVerticalPodAutoscaler, ObjectKey, ObjectStore, StoreError, VerticalPodAutoscaler,
    WorkloadRef,
};

/// Talks to the cluster on behalf of the reconciler.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn autoscalers(&self, namespace: &str) -> Api<DynamicVerticalPodAutoscaler> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn vpas(&self, namespace: &str) -> Api<VerticalPodAutoscaler> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn object_namespace(namespace: Option<&str>) -> Result<&str, StoreError> {
    namespace.ok_or_else(|| StoreError::Other(anyhow::anyhow!("object has no namespace")))
}

fn object_name(name: Option<&str>) -> Result<&str, StoreError> {
    name.ok_or_else(|| StoreError::Other(anyhow::anyhow!("object has no name")))
}

/// Splits an `apiVersion` value into group and version. Core-group resources
/// carry a bare version with no slash.
fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn child_kind_available(&self) -> Result<bool, StoreError> {
        let gvk = GroupVersionKind::gvk("autoscaling.k8s.io", "v1", "VerticalPodAutoscaler");
        match discovery::oneshot::pinned_kind(&self.client, &gvk).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(false),
            Err(err) => Err(StoreError::Other(err.into())),
        }
    }

    async fn get_autoscaler(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<DynamicVerticalPodAutoscaler>, StoreError> {
        self.autoscalers(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|err| StoreError::Other(err.into()))
    }

    async fn get_workload(&self, workload: &WorkloadRef) -> Result<Option<Value>, StoreError> {
        let (group, version) = split_api_version(&workload.api_version);
        let resource =
            ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, &workload.kind));
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &workload.namespace, &resource);

        match api.get_opt(&workload.name).await {
            Ok(Some(obj)) => serde_json::to_value(&obj)
                .map(Some)
                .map_err(|err| StoreError::Other(err.into())),
            Ok(None) => Ok(None),
            // An uninstalled workload kind reads the same as a missing object.
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(None),
            Err(err) => Err(StoreError::Other(err.into())),
        }
    }

    async fn get_vpa(&self, key: &ObjectKey) -> Result<Option<VerticalPodAutoscaler>, StoreError> {
        self.vpas(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|err| StoreError::Other(err.into()))
    }

    async fn create_vpa(
        &self,
        vpa: &VerticalPodAutoscaler,
    ) -> Result<VerticalPodAutoscaler, StoreError> {
        let namespace = object_namespace(vpa.metadata.namespace.as_deref())?;
        match self.vpas(namespace).create(&PostParams::default(), vpa).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                Err(StoreError::AlreadyExists(resp.message))
            }
            Err(err) => Err(StoreError::Other(err.into())),
        }
    }

    async fn update_vpa(
        &self,
        vpa: &VerticalPodAutoscaler,
    ) -> Result<VerticalPodAutoscaler, StoreError> {
        let namespace = object_namespace(vpa.metadata.namespace.as_deref())?;
        let name = object_name(vpa.metadata.name.as_deref())?;
        match self
            .vpas(namespace)
            .replace(name, &PostParams::default(), vpa)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                Err(StoreError::Conflict(resp.message))
            }
            Err(err) => Err(StoreError::Other(err.into())),
        }
    }

    async fn update_autoscaler_status(
        &self,
        obj: &DynamicVerticalPodAutoscaler,
    ) -> Result<DynamicVerticalPodAutoscaler, StoreError> {
        let namespace = object_namespace(obj.metadata.namespace.as_deref())?;
        let name = object_name(obj.metadata.name.as_deref())?;
        let patch = Patch::Merge(json!({ "status": obj.status }));
        match self
            .autoscalers(namespace)
            .patch_status(name, &PatchParams::default(), &patch)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                Err(StoreError::Conflict(resp.message))
            }
            Err(err) => Err(StoreError::Other(err.into())),
        }
    }
}
