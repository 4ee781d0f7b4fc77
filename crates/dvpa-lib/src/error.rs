//! Error taxonomy for a reconciliation pass
//!
//! Every variant is fatal for the current pass; retry and backoff belong to
//! the scheduler that invoked us. A missing DynamicVerticalPodAutoscaler is
//! not an error (see [`crate::reconcile::Outcome::Gone`]).

use thiserror::Error;

use crate::expr::ExprError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    /// Required spec fields are missing or empty. Raised before any target
    /// or child lookup; no store writes are attempted.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// Object metadata the pass depends on is absent.
    #[error("missing object key: {0}")]
    MissingObjectKey(&'static str),

    /// The managed child kind is not registered in the store. Operator-level
    /// misconfiguration; install the VerticalPodAutoscaler CRD.
    #[error("precondition failed: {0}")]
    Precondition(&'static str),

    /// A policy condition failed to compile or evaluate.
    #[error("policy {index}: {source}")]
    Policy {
        index: usize,
        #[source]
        source: ExprError,
    },

    /// The full policy list was scanned and nothing matched. Distinct from a
    /// matched policy with `skip: true`, which is a clean no-op.
    #[error("no matching policy found")]
    NoMatch,

    /// A store read or write failed, including optimistic-concurrency
    /// conflicts. Propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An object could not be converted into its evaluation value tree.
    #[error("failed to build evaluation environment: {0}")]
    Environment(#[from] serde_json::Error),
}
