//! Core library for the dynamic vertical pod autoscaler operator
//!
//! This crate provides the core functionality for:
//! - DynamicVerticalPodAutoscaler and VerticalPodAutoscaler API types
//! - Policy condition compilation and evaluation
//! - First-match-wins policy selection
//! - Desired-state synthesis and the reconciliation pass
//! - Health checks and observability
//!
//! All cluster I/O goes through the [`store::ObjectStore`] trait so the
//! reconciler can be exercised without a cluster.

pub mod api;
pub mod env;
pub mod error;
pub mod expr;
pub mod health;
pub mod observability;
pub mod policy;
pub mod reconcile;
pub mod store;
pub mod synthesis;

pub use api::{DynamicVerticalPodAutoscaler, VerticalPodAutoscaler};
pub use env::Environment;
pub use error::Error;
pub use expr::{ExpressionEngine, PredicateEngine};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use observability::{ControllerMetrics, StructuredLogger};
pub use reconcile::{ChildAction, Outcome, Reconciler, DEFAULT_REQUEUE_INTERVAL};
pub use store::{ObjectKey, ObjectStore, StoreError, WorkloadRef};
