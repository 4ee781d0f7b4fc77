//! API types for the DynamicVerticalPodAutoscaler CRD and the managed
//! VerticalPodAutoscaler child resource.
//!
//! The child types model the subset of the upstream `autoscaling.k8s.io/v1`
//! VerticalPodAutoscaler schema this operator writes. Everything is plain
//! serde data; all behavior lives in the reconciler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a DynamicVerticalPodAutoscaler
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "autoscaling.stackrox.io",
    version = "v1alpha1",
    kind = "DynamicVerticalPodAutoscaler",
    namespaced,
    status = "DynamicVerticalPodAutoscalerStatus",
    shortname = "dvpa"
)]
#[serde(rename_all = "camelCase")]
pub struct DynamicVerticalPodAutoscalerSpec {
    /// Workload whose pods are vertically scaled. The namespace is implied
    /// by the DynamicVerticalPodAutoscaler's own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// Ordered policy list; the first policy whose condition holds is
    /// applied. Must be non-empty.
    #[serde(default)]
    pub policies: Vec<AutoscalingPolicy>,
}

/// Observed state of a DynamicVerticalPodAutoscaler
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DynamicVerticalPodAutoscalerStatus {
    /// The last time the VerticalPodAutoscaler child was created or updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpa_last_update_time: Option<DateTime<Utc>>,
}

/// One conditional policy
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingPolicy {
    /// Boolean expression over the `target`, `vpa` and `obj` bindings.
    /// Absent or empty means "always true".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// When true, a match ends the pass without touching the child.
    #[serde(default)]
    pub skip: bool,

    /// Template for the child spec applied when this policy matches.
    #[serde(default)]
    pub vpa_spec: VpaTemplate,
}

/// Per-policy tuning copied into the child spec on match. The targetRef is
/// deliberately absent: it always comes from the owner.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VpaTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<PodUpdatePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<PodResourcePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommenders: Option<Vec<RecommenderSelector>>,
}

/// Reference to the workload under vertical scaling
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub name: String,
}

/// Managed subset of the upstream VerticalPodAutoscaler spec
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "autoscaling.k8s.io",
    version = "v1",
    kind = "VerticalPodAutoscaler",
    namespaced,
    shortname = "vpa"
)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<PodUpdatePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<PodResourcePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommenders: Option<Vec<RecommenderSelector>>,
}

/// How recommendations are applied to pods
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodUpdatePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_mode: Option<UpdateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
}

/// Update mode for the VPA updater
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum UpdateMode {
    Off,
    Initial,
    Recreate,
    Auto,
}

/// Constraints on per-container recommendations
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodResourcePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_policies: Option<Vec<ContainerResourcePolicy>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResourcePolicy {
    /// Container name, or "*" as a wildcard for defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ContainerScalingMode>,
    /// Lower bound per resource, e.g. {"cpu": "100m", "memory": "64Mi"}.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_allowed: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_allowed: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlled_resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlled_values: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ContainerScalingMode {
    Auto,
    Off,
}

/// Recommender responsible for this object's recommendation
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecommenderSelector {
    pub name: String,
}
