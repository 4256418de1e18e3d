//! Core data models for the autoscaler controller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of scalable workload that gets a managed autoscaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    ReplicationController,
}

impl WorkloadKind {
    /// Kind string used in the autoscaler's scale target reference
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::ReplicationController => "ReplicationController",
        }
    }

    /// API version of the scale target for this kind
    pub fn api_version(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "apps/v1",
            WorkloadKind::ReplicationController => "v1",
        }
    }

    /// Human-readable name used in log messages
    pub fn display_name(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::ReplicationController => "replication controller",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a watched workload, derived from the watched object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
    pub kind: WorkloadKind,
}

impl WorkloadRef {
    pub fn new(kind: WorkloadKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind,
        }
    }
}

/// Event delivered by a workload watch stream
///
/// Closure of the stream is signalled by the stream ending, not by a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadEvent {
    Added(WorkloadRef),
    Modified(WorkloadRef),
    Deleted(WorkloadRef),
}

/// Bounds applied to every autoscaler the controller creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerPolicy {
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub target_cpu_percent: i32,
}

impl Default for AutoscalerPolicy {
    fn default() -> Self {
        Self {
            min_replicas: 2,
            max_replicas: 8,
            target_cpu_percent: 75,
        }
    }
}

/// Scale target of an autoscaler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTarget {
    pub kind: WorkloadKind,
    pub api_version: String,
    pub name: String,
}

/// Desired autoscaler, built fresh for each creation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerSpec {
    pub name: String,
    pub namespace: String,
    pub target: ScaleTarget,
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub target_cpu_percent: i32,
}

impl AutoscalerSpec {
    /// Build the autoscaler for a workload; the autoscaler shares the workload's name
    pub fn for_workload(workload: &WorkloadRef, policy: &AutoscalerPolicy) -> Self {
        Self {
            name: workload.name.clone(),
            namespace: workload.namespace.clone(),
            target: ScaleTarget {
                kind: workload.kind,
                api_version: workload.kind.api_version().to_string(),
                name: workload.name.clone(),
            },
            min_replicas: policy.min_replicas,
            max_replicas: policy.max_replicas,
            target_cpu_percent: policy.target_cpu_percent,
        }
    }
}

/// Observed state of an autoscaler; fields the control plane has not populated are zero
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerStatus {
    pub observed_generation: i64,
    pub last_scale_time: Option<DateTime<Utc>>,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub current_cpu_utilization_percent: i32,
}

/// An autoscaler as listed from the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerRecord {
    pub name: String,
    pub namespace: String,
    pub status: AutoscalerStatus,
}
