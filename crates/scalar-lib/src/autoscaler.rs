//! Autoscaler lifecycle: create, delete and list managed autoscalers

use crate::error::{Result, ScalarError};
use crate::models::{AutoscalerPolicy, AutoscalerRecord, AutoscalerSpec, WorkloadRef};
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use tracing::info;

/// Creates and deletes autoscalers for watched workloads
///
/// None of these operations touch the membership cache; the reconciler
/// decides how the cache follows each attempt.
#[derive(Clone)]
pub struct AutoscalerLifecycle {
    orchestrator: Arc<dyn Orchestrator>,
    policy: AutoscalerPolicy,
}

impl AutoscalerLifecycle {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, policy: AutoscalerPolicy) -> Self {
        Self {
            orchestrator,
            policy,
        }
    }

    pub fn policy(&self) -> &AutoscalerPolicy {
        &self.policy
    }

    /// Create the autoscaler targeting `workload`
    pub async fn create(&self, workload: &WorkloadRef) -> Result<()> {
        info!(
            kind = %workload.kind,
            name = %workload.name,
            namespace = %workload.namespace,
            "Creating horizontal pod autoscaler for {} {} in {}",
            workload.kind.display_name(),
            workload.name,
            workload.namespace
        );

        let spec = AutoscalerSpec::for_workload(workload, &self.policy);
        self.orchestrator
            .create_autoscaler(&spec)
            .await
            .map_err(|source| ScalarError::Creation {
                kind: workload.kind,
                name: workload.name.clone(),
                namespace: workload.namespace.clone(),
                source,
            })
    }

    /// Delete the autoscaler `name` in `namespace`
    pub async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        info!(
            name = %name,
            namespace = %namespace,
            "Deleting horizontal pod autoscaler {} in {}",
            name,
            namespace
        );

        self.orchestrator
            .delete_autoscaler(name, namespace)
            .await
            .map_err(|source| ScalarError::Deletion {
                name: name.to_string(),
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Live autoscalers in one namespace
    pub async fn list_by_namespace(&self, namespace: &str) -> Result<Vec<AutoscalerRecord>> {
        self.orchestrator
            .list_autoscalers(Some(namespace))
            .await
            .map_err(|source| ScalarError::List {
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Every autoscaler in the cluster, used to seed the cache at startup
    pub async fn list_all(&self) -> Result<Vec<AutoscalerRecord>> {
        self.orchestrator
            .list_autoscalers(None)
            .await
            .map_err(ScalarError::Seed)
    }
}
