//! Reconciliation of workloads and their autoscalers
//!
//! The reconciler owns the membership cache and drives a single loop over the
//! Deployment watch, the ReplicationController watch and the status timer,
//! handling exactly one event per iteration.

mod r#loop;
mod sessions;


pub use r#loop::Reconciler;
pub use sessions::WatchSessions;

use crate::health::HealthRegistry;
use crate::models::AutoscalerPolicy;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Duration;

/// Longest accepted status cadence; longer periods are clamped to this
pub const MAX_STATUS_INTERVAL: Duration = Duration::from_secs(365 * 24 * 3600);

/// Configuration for the reconciliation loop
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Label selector restricting the watched workloads (empty matches all)
    pub selector: String,
    /// Bounds for created autoscalers
    pub policy: AutoscalerPolicy,
    /// Whether the status timer renders a report
    pub print_status: bool,
    /// Status timer cadence (default: 30 minutes)
    pub status_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            selector: String::new(),
            policy: AutoscalerPolicy::default(),
            print_status: true,
            status_interval: Duration::from_secs(1800),
        }
    }
}

/// Builder for the reconciler
pub struct ReconcilerBuilder {
    orchestrator: Arc<dyn Orchestrator>,
    health: Option<HealthRegistry>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            orchestrator,
            health: None,
            config: ReconcilerConfig::default(),
        }
    }

    pub fn config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.config.selector = selector.into();
        self
    }

    pub fn policy(mut self, policy: AutoscalerPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn print_status(mut self, enabled: bool) -> Self {
        self.config.print_status = enabled;
        self
    }

    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.config.status_interval = interval;
        self
    }

    /// Share a health registry with the probe endpoints
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Reconciler {
        Reconciler::new(
            self.orchestrator,
            self.config,
            self.health.unwrap_or_default(),
        )
    }
}
