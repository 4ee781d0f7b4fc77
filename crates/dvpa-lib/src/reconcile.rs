//! Reconciliation orchestrator
//!
//! One idempotent pass per invocation: preflight, fetch, validate, resolve
//! target and existing child, build the environment, match a policy,
//! synthesize the desired child and persist it with status bookkeeping.
//! No internal retries and no partial commits; any error aborts the pass and
//! is handed back to the scheduler, which owns retry/backoff.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::api::{
    DynamicVerticalPodAutoscalerSpec, DynamicVerticalPodAutoscalerStatus, TargetRef,
};
use crate::env::Environment;
use crate::error::Error;
use crate::expr::ExpressionEngine;
use crate::policy;
use crate::store::{ObjectKey, ObjectStore, WorkloadRef};
use crate::synthesis;

/// Default fixed requeue delay after a successful pass
pub const DEFAULT_REQUEUE_INTERVAL: Duration = Duration::from_secs(10);

/// What a successful pass did to the child resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildAction {
    /// Child was absent and has been created.
    Created,
    /// Child existed with a different spec and has been updated.
    Updated,
    /// Child already matched the desired spec; nothing written.
    Unchanged,
    /// The matched policy's skip flag was set; nothing written.
    Skipped,
}

/// Result of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The autoscaler no longer exists; treated as deletion, not an error.
    Gone,
    /// The pass completed; re-invoke after the fixed requeue interval to
    /// keep observing drift.
    Reconciled(ChildAction),
}

/// Sequences a reconciliation pass over an [`ObjectStore`]
pub struct Reconciler<S, E> {
    store: S,
    engine: E,
    requeue_interval: Duration,
}

impl<S: ObjectStore, E: ExpressionEngine> Reconciler<S, E> {
    /// The requeue interval is explicit configuration, not process state.
    pub fn new(store: S, engine: E, requeue_interval: Duration) -> Self {
        Self {
            store,
            engine,
            requeue_interval,
        }
    }

    /// Fixed delay the scheduler should wait before re-invoking.
    pub fn requeue_interval(&self) -> Duration {
        self.requeue_interval
    }

    /// Run a single pass for one autoscaler identity.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Outcome, Error> {
        // The child kind missing from the store is operator misconfiguration,
        // not something a retry of this pass can fix.
        if !self.store.child_kind_available().await? {
            return Err(Error::Precondition(
                "the VerticalPodAutoscaler CRD is not installed",
            ));
        }

        let Some(obj) = self.store.get_autoscaler(key).await? else {
            debug!(%key, "autoscaler no longer exists");
            return Ok(Outcome::Gone);
        };

        let target_ref = validate(&obj.spec)?.clone();

        // A missing target binds `target` to an empty value and the pass
        // proceeds: conditions may intentionally test for target absence.
        let workload_ref = WorkloadRef {
            api_version: target_ref.api_version.clone(),
            kind: target_ref.kind.clone(),
            namespace: key.namespace.clone(),
            name: target_ref.name.clone(),
        };
        let target = self.store.get_workload(&workload_ref).await?;

        // Absence of the child is normal on the first pass.
        let existing = self.store.get_vpa(key).await?;

        let env = Environment::build(&obj, existing.as_ref(), target.as_ref())?;
        let matched = policy::first_match(&self.engine, &obj.spec.policies, &env)?;

        if matched.policy.skip {
            debug!(%key, index = matched.index, "matched policy skips reconciliation");
            return Ok(Outcome::Reconciled(ChildAction::Skipped));
        }

        let desired = synthesis::desired_vpa(&obj, &target_ref, &matched.policy.vpa_spec)?;

        let action = match existing {
            None => {
                info!(%key, index = matched.index, "creating VerticalPodAutoscaler");
                self.store.create_vpa(&desired).await?;
                ChildAction::Created
            }
            Some(mut existing) => {
                if existing.spec == desired.spec {
                    debug!(%key, "no update needed");
                    ChildAction::Unchanged
                } else {
                    info!(%key, index = matched.index, "updating VerticalPodAutoscaler");
                    // The owner reference is refreshed as part of the same
                    // write, covering retargeting across resource versions.
                    existing.spec = desired.spec;
                    existing.metadata.owner_references = desired.metadata.owner_references.clone();
                    self.store.update_vpa(&existing).await?;
                    ChildAction::Updated
                }
            }
        };

        // Status moves only after a successful child write.
        if matches!(action, ChildAction::Created | ChildAction::Updated) {
            let mut obj = obj;
            obj.status = Some(DynamicVerticalPodAutoscalerStatus {
                vpa_last_update_time: Some(Utc::now()),
            });
            self.store.update_autoscaler_status(&obj).await?;
        }

        Ok(Outcome::Reconciled(action))
    }
}

fn validate(spec: &DynamicVerticalPodAutoscalerSpec) -> Result<&TargetRef, Error> {
    let target_ref = spec
        .target_ref
        .as_ref()
        .ok_or(Error::Validation("targetRef is required"))?;
    if target_ref.kind.is_empty() {
        return Err(Error::Validation("targetRef.kind is required"));
    }
    if target_ref.api_version.is_empty() {
        return Err(Error::Validation("targetRef.apiVersion is required"));
    }
    if target_ref.name.is_empty() {
        return Err(Error::Validation("targetRef.name is required"));
    }
    if spec.policies.is_empty() {
        return Err(Error::Validation("policies is required"));
    }
    Ok(target_ref)
}
