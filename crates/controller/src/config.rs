//! Controller configuration

use anyhow::Result;
use serde::Deserialize;

/// Controller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Fixed requeue delay after a successful reconciliation, in seconds
    #[serde(default = "default_requeue_interval")]
    pub requeue_interval_secs: u64,

    /// Requeue delay after a failed reconciliation, in seconds
    #[serde(default = "default_error_requeue")]
    pub error_requeue_secs: u64,
}

fn default_api_port() -> u16 {
    8080
}

fn default_requeue_interval() -> u64 {
    10
}

fn default_error_requeue() -> u64 {
    5
}

impl ControllerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DVPA"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ControllerConfig {
            api_port: default_api_port(),
            requeue_interval_secs: default_requeue_interval(),
            error_requeue_secs: default_error_requeue(),
        }))
    }
}
