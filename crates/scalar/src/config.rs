//! Controller configuration
//!
//! Read from `SCALAR_*` environment variables; anything unset falls back to
//! the defaults below.

use anyhow::{ensure, Context, Result};
use scalar_lib::{AutoscalerPolicy, ReconcilerConfig, MAX_STATUS_INTERVAL};
use serde::Deserialize;
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScalarConfig {
    /// Label selector for watched workloads (`SCALAR_SELECTOR`)
    #[serde(default)]
    pub selector: String,

    #[serde(default = "default_min_replicas")]
    pub min_replicas: i32,

    #[serde(default = "default_max_replicas")]
    pub max_replicas: i32,

    /// Target CPU utilization percentage (`SCALAR_TARGET_CPU`)
    #[serde(default = "default_target_cpu")]
    pub target_cpu: i32,

    #[serde(default = "default_print_status")]
    pub print_status: bool,

    /// Status report cadence in seconds (`SCALAR_STATUS_TIMER`)
    #[serde(default = "default_status_timer")]
    pub status_timer: u64,

    /// Port for health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_min_replicas() -> i32 {
    2
}

fn default_max_replicas() -> i32 {
    8
}

fn default_target_cpu() -> i32 {
    75
}

fn default_print_status() -> bool {
    true
}

fn default_status_timer() -> u64 {
    1800
}

fn default_api_port() -> u16 {
    8080
}

impl ScalarConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix("SCALAR"))
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read SCALAR_* environment")?;

        let config: Self = config
            .try_deserialize()
            .context("Invalid SCALAR_* configuration")?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.min_replicas >= 1,
            "min replicas must be at least 1, got {}",
            self.min_replicas
        );
        ensure!(
            self.max_replicas >= self.min_replicas,
            "max replicas ({}) must not be below min replicas ({})",
            self.max_replicas,
            self.min_replicas
        );
        ensure!(
            (1..=100).contains(&self.target_cpu),
            "target CPU must be between 1 and 100 percent, got {}",
            self.target_cpu
        );
        ensure!(self.status_timer > 0, "status timer must be positive");
        ensure!(
            self.status_timer <= MAX_STATUS_INTERVAL.as_secs(),
            "status timer must not exceed {} seconds, got {}",
            MAX_STATUS_INTERVAL.as_secs(),
            self.status_timer
        );
        Ok(())
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            selector: self.selector.clone(),
            policy: AutoscalerPolicy {
                min_replicas: self.min_replicas,
                max_replicas: self.max_replicas,
                target_cpu_percent: self.target_cpu,
            },
            print_status: self.print_status,
            status_interval: Duration::from_secs(self.status_timer),
        }
    }
}
