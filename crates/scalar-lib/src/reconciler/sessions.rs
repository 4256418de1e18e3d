//! Paired workload watch sessions

use crate::error::{Result, ScalarError};
use crate::models::WorkloadKind;
use crate::orchestrator::{Orchestrator, WatchStream};
use tracing::info;

/// One watch per workload kind, opened and discarded together
pub struct WatchSessions {
    pub(crate) deployments: WatchStream,
    pub(crate) replication_controllers: WatchStream,
}

impl WatchSessions {
    /// Open both watches; either failing fails the pair
    pub async fn open(orchestrator: &dyn Orchestrator, selector: &str) -> Result<Self> {
        let deployments = open_watch(orchestrator, WorkloadKind::Deployment, selector).await?;
        let replication_controllers =
            open_watch(orchestrator, WorkloadKind::ReplicationController, selector).await?;

        info!(selector = %selector, "Watch sessions established");

        Ok(Self {
            deployments,
            replication_controllers,
        })
    }
}

async fn open_watch(
    orchestrator: &dyn Orchestrator,
    kind: WorkloadKind,
    selector: &str,
) -> Result<WatchStream> {
    orchestrator
        .watch_workloads(kind, selector)
        .await
        .map_err(|source| ScalarError::Watch { kind, source })
}
