//! Access to the orchestration control plane
//!
//! The controller core only talks to the cluster through the [`Orchestrator`]
//! trait. [`KubeOrchestrator`] is the production implementation on top of the
//! Kubernetes API; tests substitute their own.

mod kubernetes;

pub use kubernetes::KubeOrchestrator;

use crate::error::ClientError;
use crate::models::{AutoscalerRecord, AutoscalerSpec, WorkloadEvent, WorkloadKind};
use futures::stream::BoxStream;

pub use async_trait::async_trait;

/// Stream of workload events; the stream ending means the watch was closed
pub type WatchStream = BoxStream<'static, WorkloadEvent>;

/// Operations the controller needs from the control plane
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Open a watch on workloads of `kind` matching the label `selector`
    async fn watch_workloads(
        &self,
        kind: WorkloadKind,
        selector: &str,
    ) -> Result<WatchStream, ClientError>;

    /// List autoscalers in `namespace`, or in every namespace when `None`
    async fn list_autoscalers(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<AutoscalerRecord>, ClientError>;

    /// Submit a new autoscaler
    async fn create_autoscaler(&self, spec: &AutoscalerSpec) -> Result<(), ClientError>;

    /// Delete the autoscaler `name` in `namespace`
    async fn delete_autoscaler(&self, name: &str, namespace: &str) -> Result<(), ClientError>;
}
