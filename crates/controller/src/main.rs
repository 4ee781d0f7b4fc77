//! Dynamic VPA controller
//!
//! Watches DynamicVerticalPodAutoscaler objects cluster-wide, owns the
//! VerticalPodAutoscaler children it creates and drives one reconciliation
//! pass per change or requeue tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dvpa_lib::{
    health::components, ChildAction, ControllerMetrics, DynamicVerticalPodAutoscaler, Error,
    HealthRegistry, ObjectKey, Outcome, PredicateEngine, Reconciler, StructuredLogger,
    VerticalPodAutoscaler,
};

mod api;
mod config;
mod kube_store;

use kube_store::KubeStore;

const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// State shared across reconcile invocations
struct Context {
    reconciler: Reconciler<KubeStore, PredicateEngine>,
    error_requeue: Duration,
    metrics: ControllerMetrics,
    logger: StructuredLogger,
}

fn action_label(action: ChildAction) -> &'static str {
    match action {
        ChildAction::Created => "created",
        ChildAction::Updated => "updated",
        ChildAction::Unchanged => "unchanged",
        ChildAction::Skipped => "skipped",
    }
}

async fn reconcile(
    obj: Arc<DynamicVerticalPodAutoscaler>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    let namespace = obj
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let key = ObjectKey::new(namespace, obj.name_any());

    let start = Instant::now();
    let result = ctx.reconciler.reconcile(&key).await;
    ctx.metrics
        .observe_reconcile_latency(start.elapsed().as_secs_f64());

    match result {
        Ok(Outcome::Gone) => Ok(Action::await_change()),
        Ok(Outcome::Reconciled(action)) => {
            ctx.metrics.inc_reconciliations();
            match action {
                ChildAction::Created => ctx.metrics.inc_child_created(),
                ChildAction::Updated => ctx.metrics.inc_child_updated(),
                ChildAction::Unchanged | ChildAction::Skipped => {}
            }
            ctx.logger
                .log_reconciled(&key.namespace, &key.name, action_label(action));
            Ok(Action::requeue(ctx.reconciler.requeue_interval()))
        }
        Err(err) => {
            ctx.metrics.inc_reconcile_errors();
            ctx.logger
                .log_reconcile_failed(&key.namespace, &key.name, &err.to_string());
            Err(err)
        }
    }
}

fn error_policy(
    _obj: Arc<DynamicVerticalPodAutoscaler>,
    _error: &Error,
    ctx: Arc<Context>,
) -> Action {
    Action::requeue(ctx.error_requeue)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting dvpa-controller");

    // Load configuration
    let config = config::ControllerConfig::load()?;
    info!(
        requeue_interval_secs = config.requeue_interval_secs,
        "Controller configured"
    );

    let client = Client::try_default().await?;

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::RECONCILER).await;
    health_registry.register(components::KUBE_CLIENT).await;

    // Initialize metrics
    let metrics = ControllerMetrics::new();

    // Initialize structured logger
    let logger = StructuredLogger::new("dvpa-controller");
    logger.log_startup(CONTROLLER_VERSION);

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));

    let store = KubeStore::new(client.clone());
    let reconciler = Reconciler::new(
        store,
        PredicateEngine,
        Duration::from_secs(config.requeue_interval_secs),
    );
    let ctx = Arc::new(Context {
        reconciler,
        error_requeue: Duration::from_secs(config.error_requeue_secs),
        metrics,
        logger: logger.clone(),
    });

    // Mark controller as ready after initialization
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let autoscalers = Api::<DynamicVerticalPodAutoscaler>::all(client.clone());
    let vpas = Api::<VerticalPodAutoscaler>::all(client);

    Controller::new(autoscalers, watcher::Config::default())
        .owns(vpas, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(obj) => tracing::debug!(object = ?obj, "reconcile scheduled"),
                Err(err) => tracing::warn!(error = %err, "reconcile failed"),
            }
        })
        .await;

    logger.log_shutdown("watch stream terminated");
    info!("Shutting down");

    Ok(())
}
