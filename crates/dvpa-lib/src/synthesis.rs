//! Desired-state synthesis for the VerticalPodAutoscaler child
//!
//! Pure functions: identical inputs always produce a structurally identical
//! output, which keeps the reconciler's diff stable.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

use crate::api::{
    DynamicVerticalPodAutoscaler, TargetRef, VerticalPodAutoscaler, VerticalPodAutoscalerSpec,
    VpaTemplate,
};
use crate::error::Error;

/// Desired child spec from the owner's target reference and the matched
/// policy's template. The targetRef always comes from the owner, never from
/// the template.
pub fn desired_vpa_spec(target_ref: &TargetRef, template: &VpaTemplate) -> VerticalPodAutoscalerSpec {
    VerticalPodAutoscalerSpec {
        target_ref: Some(target_ref.clone()),
        update_policy: template.update_policy.clone(),
        resource_policy: template.resource_policy.clone(),
        recommenders: template.recommenders.clone(),
    }
}

/// Full desired child object: same namespace/name as the owner, a controller
/// owner reference back to it, and the synthesized spec.
pub fn desired_vpa(
    owner: &DynamicVerticalPodAutoscaler,
    target_ref: &TargetRef,
    template: &VpaTemplate,
) -> Result<VerticalPodAutoscaler, Error> {
    let name = owner
        .metadata
        .name
        .clone()
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;
    let namespace = owner
        .metadata
        .namespace
        .clone()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let owner_ref = owner
        .controller_owner_ref(&())
        .ok_or(Error::MissingObjectKey(".metadata.uid"))?;

    Ok(VerticalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            owner_references: Some(vec![owner_ref]),
            ..Default::default()
        },
        spec: desired_vpa_spec(target_ref, template),
    })
}
