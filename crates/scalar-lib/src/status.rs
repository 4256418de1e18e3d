//! Periodic status report of managed autoscalers

use crate::autoscaler::AutoscalerLifecycle;
use crate::cache::MembershipCache;
use crate::error::Result;
use crate::models::AutoscalerRecord;
use std::io::Write;

/// Renders one line per live autoscaler in every cached namespace
pub struct StatusReporter {
    lifecycle: AutoscalerLifecycle,
}

impl StatusReporter {
    pub fn new(lifecycle: AutoscalerLifecycle) -> Self {
        Self { lifecycle }
    }

    /// Report to standard output
    pub async fn report(&self, cache: &MembershipCache) -> Result<usize> {
        self.report_to(cache, &mut std::io::stdout()).await
    }

    /// Report to `out`, returning the number of lines written
    ///
    /// A failed list aborts the report; lines already written are left in place.
    pub async fn report_to<W: Write>(&self, cache: &MembershipCache, out: &mut W) -> Result<usize> {
        let mut lines = 0;

        for namespace in cache.namespaces() {
            let records = self.lifecycle.list_by_namespace(namespace).await?;

            for record in &records {
                writeln!(out, "{}", format_status_line(record, namespace))?;
                lines += 1;
            }
        }

        out.flush()?;
        Ok(lines)
    }
}

/// Format a single status line
pub fn format_status_line(record: &AutoscalerRecord, namespace: &str) -> String {
    let status = &record.status;
    let last_scale_time = status
        .last_scale_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "Status for HPA \"{}\" in {}: | ObservedGeneration: {} | LastScaleTime: {} | CurrentReplicas: {} | DesiredReplicas: {} | CurrentCPUUtilizationPercentage: {} |",
        record.name,
        namespace,
        status.observed_generation,
        last_scale_time,
        status.current_replicas,
        status.desired_replicas,
        status.current_cpu_utilization_percent
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, ScalarError};
    use crate::models::{AutoscalerPolicy, AutoscalerSpec, AutoscalerStatus, WorkloadKind};
    use crate::orchestrator::{async_trait, Orchestrator, WatchStream};
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    /// Serves fixed records and refuses every list from call `fail_from` on
    #[derive(Default)]
    struct ListingOrchestrator {
        records: Vec<AutoscalerRecord>,
        fail_from: Option<usize>,
        listed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Orchestrator for ListingOrchestrator {
        async fn watch_workloads(
            &self,
            _kind: WorkloadKind,
            _selector: &str,
        ) -> std::result::Result<WatchStream, ClientError> {
            Err(ClientError::Rejected("not watched".to_string()))
        }

        async fn list_autoscalers(
            &self,
            namespace: Option<&str>,
        ) -> std::result::Result<Vec<AutoscalerRecord>, ClientError> {
            let namespace = namespace.unwrap_or_default().to_string();
            let mut listed = self.listed.lock().unwrap();
            listed.push(namespace.clone());

            if self.fail_from.is_some_and(|n| listed.len() > n) {
                return Err(ClientError::Rejected("list failed".to_string()));
            }

            Ok(self
                .records
                .iter()
                .filter(|r| r.namespace == namespace)
                .cloned()
                .collect())
        }

        async fn create_autoscaler(
            &self,
            _spec: &AutoscalerSpec,
        ) -> std::result::Result<(), ClientError> {
            Ok(())
        }

        async fn delete_autoscaler(
            &self,
            _name: &str,
            _namespace: &str,
        ) -> std::result::Result<(), ClientError> {
            Ok(())
        }
    }

    fn record(name: &str, namespace: &str) -> AutoscalerRecord {
        AutoscalerRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            status: AutoscalerStatus::default(),
        }
    }

    fn reporter(orchestrator: &Arc<ListingOrchestrator>) -> StatusReporter {
        StatusReporter::new(AutoscalerLifecycle::new(
            orchestrator.clone(),
            AutoscalerPolicy::default(),
        ))
    }

    fn two_namespace_setup(
        fail_from: Option<usize>,
    ) -> (Arc<ListingOrchestrator>, MembershipCache) {
        let orchestrator = Arc::new(ListingOrchestrator {
            records: vec![
                record("web", "good"),
                record("api", "good"),
                record("db", "bad"),
            ],
            fail_from,
            ..Default::default()
        });

        let mut cache = MembershipCache::new();
        cache.add("web", "good");
        cache.add("api", "good");
        cache.add("db", "bad");

        (orchestrator, cache)
    }

    #[tokio::test]
    async fn test_report_renders_every_namespace() {
        let (orchestrator, cache) = two_namespace_setup(None);
        let mut out = Vec::new();

        let lines = reporter(&orchestrator)
            .report_to(&cache, &mut out)
            .await
            .unwrap();

        assert_eq!(lines, 3);
        let text = String::from_utf8(out).unwrap();
        let mut rendered: Vec<&str> = text.lines().collect();
        rendered.sort();

        let mut expected = vec![
            format_status_line(&record("web", "good"), "good"),
            format_status_line(&record("api", "good"), "good"),
            format_status_line(&record("db", "bad"), "bad"),
        ];
        expected.sort();
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn test_failed_list_aborts_and_keeps_written_lines() {
        let (orchestrator, cache) = two_namespace_setup(Some(1));
        let mut out = Vec::new();

        let result = reporter(&orchestrator).report_to(&cache, &mut out).await;

        let listed = orchestrator.listed.lock().unwrap().clone();
        assert_eq!(listed.len(), 2);
        match result {
            Err(ScalarError::List { namespace, .. }) => assert_eq!(namespace, listed[1]),
            other => panic!("expected a list error, got {:?}", other),
        }

        // Lines for the namespace listed before the failure are still in the buffer
        let first = &listed[0];
        let expected: Vec<String> = orchestrator
            .records
            .iter()
            .filter(|r| &r.namespace == first)
            .map(|r| format_status_line(r, first))
            .collect();

        let text = String::from_utf8(out).unwrap();
        let mut rendered: Vec<&str> = text.lines().collect();
        rendered.sort();
        let mut expected: Vec<&str> = expected.iter().map(String::as_str).collect();
        expected.sort();
        assert!(!rendered.is_empty());
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_format_unobserved_autoscaler() {
        let record = AutoscalerRecord {
            name: "web".to_string(),
            namespace: "default".to_string(),
            status: AutoscalerStatus::default(),
        };

        assert_eq!(
            format_status_line(&record, "default"),
            "Status for HPA \"web\" in default: | ObservedGeneration: 0 | LastScaleTime: never | CurrentReplicas: 0 | DesiredReplicas: 0 | CurrentCPUUtilizationPercentage: 0 |"
        );
    }

    #[test]
    fn test_format_observed_autoscaler() {
        let record = AutoscalerRecord {
            name: "api".to_string(),
            namespace: "prod".to_string(),
            status: AutoscalerStatus {
                observed_generation: 3,
                last_scale_time: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
                current_replicas: 4,
                desired_replicas: 6,
                current_cpu_utilization_percent: 91,
            },
        };

        let line = format_status_line(&record, "prod");
        assert!(line.contains("ObservedGeneration: 3"));
        assert!(line.contains("LastScaleTime: 2024-01-02T03:04:05+00:00"));
        assert!(line.contains("CurrentReplicas: 4"));
        assert!(line.contains("DesiredReplicas: 6"));
        assert!(line.contains("CurrentCPUUtilizationPercentage: 91"));
    }
}
