//! Resource store abstraction
//!
//! The reconciler's only I/O seam. Production uses a kube client behind this
//! trait; tests use an in-memory double with operation counters. `NotFound`
//! on reads is modelled as `Ok(None)`, never as an error.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::api::{DynamicVerticalPodAutoscaler, VerticalPodAutoscaler};

/// Namespace/name identity of a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Fully resolved reference to the target workload: the owner's targetRef
/// plus the owner's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Store failures surfaced to the reconciler
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic-concurrency rejection: the stored version changed since it
    /// was read. Resolved by the scheduler re-invoking with fresh state.
    #[error("write conflict on {0}")]
    Conflict(String),

    /// Create raced with another writer.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Anything else; propagated unchanged.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Operations the reconciler needs from the cluster resource store.
///
/// All calls are plain futures: dropping the reconcile future cancels the
/// in-flight call, and no operation performs a partial commit.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the VerticalPodAutoscaler kind is registered in the store
    /// (preflight for operator misconfiguration).
    async fn child_kind_available(&self) -> Result<bool, StoreError>;

    async fn get_autoscaler(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<DynamicVerticalPodAutoscaler>, StoreError>;

    /// Fetch the target workload as its full value tree.
    async fn get_workload(&self, workload: &WorkloadRef) -> Result<Option<Value>, StoreError>;

    async fn get_vpa(&self, key: &ObjectKey) -> Result<Option<VerticalPodAutoscaler>, StoreError>;

    async fn create_vpa(
        &self,
        vpa: &VerticalPodAutoscaler,
    ) -> Result<VerticalPodAutoscaler, StoreError>;

    async fn update_vpa(
        &self,
        vpa: &VerticalPodAutoscaler,
    ) -> Result<VerticalPodAutoscaler, StoreError>;

    /// Write the autoscaler's status subresource.
    async fn update_autoscaler_status(
        &self,
        obj: &DynamicVerticalPodAutoscaler,
    ) -> Result<DynamicVerticalPodAutoscaler, StoreError>;
}
