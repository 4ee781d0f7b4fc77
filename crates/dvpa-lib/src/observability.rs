//! Observability infrastructure for the controller
//!
//! Provides:
//! - Prometheus metrics (reconcile latency, pass/error counters, child writes)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for reconcile latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ControllerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ControllerMetricsInner {
    reconcile_latency_seconds: Histogram,
    reconciliations_total: IntCounter,
    reconcile_errors_total: IntCounter,
    child_writes_total: IntCounterVec,
}

impl ControllerMetricsInner {
    fn new() -> Self {
        Self {
            reconcile_latency_seconds: register_histogram!(
                "dvpa_controller_reconcile_latency_seconds",
                "Time spent in a single reconciliation pass",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register reconcile_latency_seconds"),

            reconciliations_total: register_int_counter!(
                "dvpa_controller_reconciliations_total",
                "Total number of completed reconciliation passes"
            )
            .expect("Failed to register reconciliations_total"),

            reconcile_errors_total: register_int_counter!(
                "dvpa_controller_reconcile_errors_total",
                "Total number of reconciliation passes that ended in an error"
            )
            .expect("Failed to register reconcile_errors_total"),

            child_writes_total: register_int_counter_vec!(
                "dvpa_controller_child_writes_total",
                "VerticalPodAutoscaler writes performed, by action",
                &["action"]
            )
            .expect("Failed to register child_writes_total"),
        }
    }
}

/// Controller metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ControllerMetrics {
    _private: (),
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControllerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record the latency of one pass
    pub fn observe_reconcile_latency(&self, duration_secs: f64) {
        self.inner().reconcile_latency_seconds.observe(duration_secs);
    }

    /// Count a completed pass
    pub fn inc_reconciliations(&self) {
        self.inner().reconciliations_total.inc();
    }

    /// Count a failed pass
    pub fn inc_reconcile_errors(&self) {
        self.inner().reconcile_errors_total.inc();
    }

    /// Count a child create
    pub fn inc_child_created(&self) {
        self.inner().child_writes_total.with_label_values(&["create"]).inc();
    }

    /// Count a child update
    pub fn inc_child_updated(&self) {
        self.inner().child_writes_total.with_label_values(&["update"]).inc();
    }
}

/// Structured logger for controller events
///
/// Provides consistent JSON-formatted logging for reconcile outcomes and
/// lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    controller: String,
}

impl StructuredLogger {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
        }
    }

    /// Log controller startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "controller_started",
            controller = %self.controller,
            controller_version = %version,
            "Controller started"
        );
    }

    /// Log controller shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            controller = %self.controller,
            reason = %reason,
            "Controller shutting down"
        );
    }

    /// Log a completed reconciliation pass
    pub fn log_reconciled(&self, namespace: &str, name: &str, action: &str) {
        info!(
            event = "reconciled",
            controller = %self.controller,
            namespace = %namespace,
            name = %name,
            action = %action,
            "Reconciled autoscaler"
        );
    }

    /// Log a failed reconciliation pass
    pub fn log_reconcile_failed(&self, namespace: &str, name: &str, error: &str) {
        warn!(
            event = "reconcile_failed",
            controller = %self.controller,
            namespace = %namespace,
            name = %name,
            error = %error,
            "Reconciliation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_metrics_creation() {
        // Note: This test may fail if run multiple times in the same process
        // due to Prometheus global registry. In practice, metrics are created
        // once. We test the structure here.
        let metrics = ControllerMetrics::new();

        metrics.observe_reconcile_latency(0.01);
        metrics.inc_reconciliations();
        metrics.inc_reconcile_errors();
        metrics.inc_child_created();
        metrics.inc_child_updated();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("dvpa-controller");
        assert_eq!(logger.controller, "dvpa-controller");
    }
}
