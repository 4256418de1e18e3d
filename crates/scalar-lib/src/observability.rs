//! Observability infrastructure for the autoscaler controller
//!
//! Provides:
//! - Prometheus metrics (autoscaler lifecycle counters, watch restarts, managed workloads)
//! - Structured JSON logging with tracing

use crate::models::WorkloadKind;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ScalarMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ScalarMetricsInner {
    autoscalers_created: IntCounterVec,
    autoscalers_deleted: IntCounter,
    create_errors: IntCounterVec,
    delete_errors: IntCounter,
    status_report_errors: IntCounter,
    watch_restarts: IntCounter,
    managed_workloads: IntGauge,
}

impl ScalarMetricsInner {
    fn new() -> Self {
        Self {
            autoscalers_created: register_int_counter_vec!(
                "scalar_autoscalers_created_total",
                "Autoscalers created, by target workload kind",
                &["kind"]
            )
            .expect("Failed to register autoscalers_created_total"),

            autoscalers_deleted: register_int_counter!(
                "scalar_autoscalers_deleted_total",
                "Autoscalers deleted after their workload disappeared"
            )
            .expect("Failed to register autoscalers_deleted_total"),

            create_errors: register_int_counter_vec!(
                "scalar_autoscaler_create_errors_total",
                "Autoscaler creations rejected by the control plane",
                &["kind"]
            )
            .expect("Failed to register autoscaler_create_errors_total"),

            delete_errors: register_int_counter!(
                "scalar_autoscaler_delete_errors_total",
                "Autoscaler deletions rejected by the control plane"
            )
            .expect("Failed to register autoscaler_delete_errors_total"),

            status_report_errors: register_int_counter!(
                "scalar_status_report_errors_total",
                "Status reports aborted by a failed list"
            )
            .expect("Failed to register status_report_errors_total"),

            watch_restarts: register_int_counter!(
                "scalar_watch_restarts_total",
                "Times the workload watch sessions were re-established"
            )
            .expect("Failed to register watch_restarts_total"),

            managed_workloads: register_int_gauge!(
                "scalar_managed_workloads",
                "Workloads currently believed to have a managed autoscaler"
            )
            .expect("Failed to register managed_workloads"),
        }
    }
}

/// Controller metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ScalarMetrics {
    _private: (),
}

impl Default for ScalarMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ScalarMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ScalarMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_created(&self, kind: WorkloadKind) {
        self.inner()
            .autoscalers_created
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn inc_create_errors(&self, kind: WorkloadKind) {
        self.inner()
            .create_errors
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn inc_deleted(&self) {
        self.inner().autoscalers_deleted.inc();
    }

    pub fn inc_delete_errors(&self) {
        self.inner().delete_errors.inc();
    }

    pub fn inc_status_report_errors(&self) {
        self.inner().status_report_errors.inc();
    }

    pub fn inc_watch_restarts(&self) {
        self.inner().watch_restarts.inc();
    }

    /// Update the managed workload gauge from the cache size
    pub fn set_managed_workloads(&self, count: usize) {
        self.inner().managed_workloads.set(count as i64);
    }

    /// Render the default registry in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&prometheus::gather())
    }
}

/// Structured logger for controller events
///
/// Emits an `event` field on every record so lifecycle events can be
/// filtered out of the JSON log stream.
#[derive(Clone)]
pub struct StructuredLogger {
    selector: String,
}

impl StructuredLogger {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    /// Log controller startup
    pub fn log_startup(&self, version: &str, cached: usize) {
        info!(
            event = "scalar_started",
            selector = %self.selector,
            version = %version,
            cached_autoscalers = cached,
            "Scalar is configured and ready to scale"
        );
    }

    /// Log controller shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "scalar_shutdown",
            reason = %reason,
            "Scalar shutting down"
        );
    }

    /// Log a failed autoscaler creation
    pub fn log_create_failed(&self, kind: WorkloadKind, name: &str, namespace: &str, error: &str) {
        warn!(
            event = "autoscaler_create_failed",
            kind = %kind,
            name = %name,
            namespace = %namespace,
            error = %error,
            "Error creating HPA for {} {} in {}",
            kind.display_name(),
            name,
            namespace
        );
    }

    /// Log a failed autoscaler deletion
    pub fn log_delete_failed(&self, name: &str, namespace: &str, error: &str) {
        warn!(
            event = "autoscaler_delete_failed",
            name = %name,
            namespace = %namespace,
            error = %error,
            "Error deleting HPA for {} in {}",
            name,
            namespace
        );
    }

    /// Log a watch restart
    pub fn log_watch_restart(&self, restarts: u64) {
        info!(
            event = "watch_restart",
            selector = %self.selector,
            restarts = restarts,
            "Restarting watchers"
        );
    }

    /// Log an unrecoverable watch restart failure
    pub fn log_fatal(&self, error: &str) {
        error!(
            event = "watch_restart_failed",
            selector = %self.selector,
            error = %error,
            "Could not re-establish watchers, aborting"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_metrics_creation() {
        let metrics = ScalarMetrics::new();

        metrics.inc_created(WorkloadKind::Deployment);
        metrics.inc_create_errors(WorkloadKind::ReplicationController);
        metrics.inc_deleted();
        metrics.inc_delete_errors();
        metrics.inc_status_report_errors();
        metrics.inc_watch_restarts();
        metrics.set_managed_workloads(3);

        // A second handle shares the registered metrics
        let _again = ScalarMetrics::new();
    }

    #[test]
    fn test_encode_includes_registered_metrics() {
        let metrics = ScalarMetrics::new();
        metrics.inc_deleted();

        let text = metrics.encode().unwrap();
        assert!(text.contains("# TYPE scalar_autoscalers_deleted_total counter"));
        assert!(text.contains("scalar_managed_workloads"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("app=web");
        assert_eq!(logger.selector, "app=web");
    }
}
