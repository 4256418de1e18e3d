//! Kubernetes-backed orchestrator
//!
//! Watches Deployments and ReplicationControllers across all namespaces and
//! manages `autoscaling/v1` HorizontalPodAutoscalers.

use super::{async_trait, Orchestrator, WatchStream};
use crate::error::ClientError;
use crate::models::{
    AutoscalerRecord, AutoscalerSpec, AutoscalerStatus, WorkloadEvent, WorkloadKind, WorkloadRef,
};
use futures::{future, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
};
use k8s_openapi::api::core::v1::ReplicationController;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams, WatchEvent, WatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Resource version asking the API server to replay current state as `Added` events
const WATCH_FROM_ANY_VERSION: &str = "0";

/// Orchestrator talking to a Kubernetes API server
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster service account, falling back to kubeconfig
    pub async fn try_default() -> Result<Self, ClientError> {
        let client = Client::try_default().await?;
        info!("Connected to Kubernetes API");
        Ok(Self::new(client))
    }

    fn autoscalers(&self, namespace: Option<&str>) -> Api<HorizontalPodAutoscaler> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn watch_workloads(
        &self,
        kind: WorkloadKind,
        selector: &str,
    ) -> Result<WatchStream, ClientError> {
        match kind {
            WorkloadKind::Deployment => {
                watch_kind(Api::<Deployment>::all(self.client.clone()), kind, selector).await
            }
            WorkloadKind::ReplicationController => {
                watch_kind(
                    Api::<ReplicationController>::all(self.client.clone()),
                    kind,
                    selector,
                )
                .await
            }
        }
    }

    async fn list_autoscalers(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<AutoscalerRecord>, ClientError> {
        let list = self
            .autoscalers(namespace)
            .list(&ListParams::default())
            .await?;

        Ok(list.items.into_iter().map(to_record).collect())
    }

    async fn create_autoscaler(&self, spec: &AutoscalerSpec) -> Result<(), ClientError> {
        self.autoscalers(Some(&spec.namespace))
            .create(&PostParams::default(), &to_hpa(spec))
            .await?;
        Ok(())
    }

    async fn delete_autoscaler(&self, name: &str, namespace: &str) -> Result<(), ClientError> {
        self.autoscalers(Some(namespace))
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

/// Open a watch on one workload kind and translate it into workload events
///
/// Error events and transport failures end the stream so the caller restarts
/// the watch. Bookmarks are dropped.
async fn watch_kind<K>(
    api: Api<K>,
    kind: WorkloadKind,
    selector: &str,
) -> Result<WatchStream, ClientError>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    let mut params = WatchParams::default();
    if !selector.is_empty() {
        params = params.labels(selector);
    }

    let stream = api.watch(&params, WATCH_FROM_ANY_VERSION).await?;
    debug!(kind = %kind, selector = %selector, "Opened workload watch");

    let events = stream
        .take_while(move |res| {
            let open = match res {
                Ok(WatchEvent::Error(err)) => {
                    warn!(
                        kind = %kind,
                        code = err.code,
                        reason = %err.reason,
                        message = %err.message,
                        "Watch reported an error, closing stream"
                    );
                    false
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Watch transport failed, closing stream");
                    false
                }
                Ok(_) => true,
            };
            future::ready(open)
        })
        .filter_map(move |res| {
            let event = match res {
                Ok(WatchEvent::Added(obj)) => Some(WorkloadEvent::Added(workload_ref(kind, &obj))),
                Ok(WatchEvent::Modified(obj)) => {
                    Some(WorkloadEvent::Modified(workload_ref(kind, &obj)))
                }
                Ok(WatchEvent::Deleted(obj)) => {
                    Some(WorkloadEvent::Deleted(workload_ref(kind, &obj)))
                }
                _ => None,
            };
            future::ready(event)
        })
        .boxed();

    Ok(events)
}

fn workload_ref<K: Resource>(kind: WorkloadKind, obj: &K) -> WorkloadRef {
    WorkloadRef::new(kind, obj.name_any(), obj.namespace().unwrap_or_default())
}

/// Build the `autoscaling/v1` object for a spec
pub(crate) fn to_hpa(spec: &AutoscalerSpec) -> HorizontalPodAutoscaler {
    HorizontalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            ..Default::default()
        },
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some(spec.target.api_version.clone()),
                kind: spec.target.kind.as_str().to_string(),
                name: spec.target.name.clone(),
            },
            min_replicas: Some(spec.min_replicas),
            max_replicas: spec.max_replicas,
            target_cpu_utilization_percentage: Some(spec.target_cpu_percent),
        }),
        status: None,
    }
}

/// Flatten a listed autoscaler into a record, zeroing unobserved fields
pub(crate) fn to_record(hpa: HorizontalPodAutoscaler) -> AutoscalerRecord {
    let name = hpa.name_any();
    let namespace = hpa.namespace().unwrap_or_default();

    let status = hpa
        .status
        .map(|s| AutoscalerStatus {
            observed_generation: s.observed_generation.unwrap_or(0),
            last_scale_time: s.last_scale_time.map(|t| t.0),
            current_replicas: s.current_replicas,
            desired_replicas: s.desired_replicas,
            current_cpu_utilization_percent: s.current_cpu_utilization_percentage.unwrap_or(0),
        })
        .unwrap_or_default();

    AutoscalerRecord {
        name,
        namespace,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AutoscalerPolicy;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscalerStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    #[test]
    fn test_to_hpa_deployment_target() {
        let workload = WorkloadRef::new(WorkloadKind::Deployment, "web", "default");
        let hpa = to_hpa(&AutoscalerSpec::for_workload(
            &workload,
            &AutoscalerPolicy::default(),
        ));

        assert_eq!(hpa.metadata.name.as_deref(), Some("web"));
        assert_eq!(hpa.metadata.namespace.as_deref(), Some("default"));

        let spec = hpa.spec.unwrap();
        assert_eq!(spec.scale_target_ref.kind, "Deployment");
        assert_eq!(spec.scale_target_ref.api_version.as_deref(), Some("apps/v1"));
        assert_eq!(spec.scale_target_ref.name, "web");
        assert_eq!(spec.min_replicas, Some(2));
        assert_eq!(spec.max_replicas, 8);
        assert_eq!(spec.target_cpu_utilization_percentage, Some(75));
    }

    #[test]
    fn test_to_hpa_replication_controller_target() {
        let workload = WorkloadRef::new(WorkloadKind::ReplicationController, "legacy", "ops");
        let hpa = to_hpa(&AutoscalerSpec::for_workload(
            &workload,
            &AutoscalerPolicy::default(),
        ));

        let target = hpa.spec.unwrap().scale_target_ref;
        assert_eq!(target.kind, "ReplicationController");
        assert_eq!(target.api_version.as_deref(), Some("v1"));
    }

    #[test]
    fn test_to_record_without_status() {
        let hpa = HorizontalPodAutoscaler {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: None,
            status: None,
        };

        let record = to_record(hpa);
        assert_eq!(record.name, "web");
        assert_eq!(record.namespace, "default");
        assert_eq!(record.status, AutoscalerStatus::default());
    }

    #[test]
    fn test_to_record_with_partial_status() {
        let scaled_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let hpa = HorizontalPodAutoscaler {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: None,
            status: Some(HorizontalPodAutoscalerStatus {
                current_cpu_utilization_percentage: None,
                current_replicas: 3,
                desired_replicas: 4,
                last_scale_time: Some(Time(scaled_at)),
                observed_generation: Some(7),
            }),
        };

        let status = to_record(hpa).status;
        assert_eq!(status.observed_generation, 7);
        assert_eq!(status.last_scale_time, Some(scaled_at));
        assert_eq!(status.current_replicas, 3);
        assert_eq!(status.desired_replicas, 4);
        assert_eq!(status.current_cpu_utilization_percent, 0);
    }
}
