//! Reconciliation loop
//!
//! Multiplexes the two workload watches and the status timer with a fair
//! select. A closed watch marks the session pair for restart; the restart is
//! awaited inline before anything else is read, and a failed restart ends the
//! loop with an error.

use super::{ReconcilerConfig, WatchSessions, MAX_STATUS_INTERVAL};
use crate::autoscaler::AutoscalerLifecycle;
use crate::cache::MembershipCache;
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::models::{WorkloadEvent, WorkloadKind, WorkloadRef};
use crate::observability::{ScalarMetrics, StructuredLogger};
use crate::orchestrator::Orchestrator;
use crate::status::StatusReporter;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lower bound on the status cadence; a zero period would spin the timer
const MIN_STATUS_INTERVAL: Duration = Duration::from_millis(1);

/// What woke the loop up
enum LoopEvent {
    /// `None` means the watch for this kind closed
    Workload(WorkloadKind, Option<WorkloadEvent>),
    StatusTick,
}

/// Keeps exactly one autoscaler per watched workload
pub struct Reconciler {
    orchestrator: Arc<dyn Orchestrator>,
    lifecycle: AutoscalerLifecycle,
    reporter: StatusReporter,
    cache: MembershipCache,
    config: ReconcilerConfig,
    metrics: ScalarMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
    restarts: u64,
}

impl Reconciler {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        config: ReconcilerConfig,
        health: HealthRegistry,
    ) -> Self {
        let lifecycle = AutoscalerLifecycle::new(orchestrator.clone(), config.policy);

        Self {
            reporter: StatusReporter::new(lifecycle.clone()),
            lifecycle,
            orchestrator,
            cache: MembershipCache::new(),
            logger: StructuredLogger::new(config.selector.clone()),
            config,
            metrics: ScalarMetrics::new(),
            health,
            restarts: 0,
        }
    }

    pub fn cache(&self) -> &MembershipCache {
        &self.cache
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Number of times the watch sessions have been replaced
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Seed the cache, open the watches and reconcile until a restart fails
    ///
    /// Only returns on error: startup failures and watch restart failures are
    /// both unrecoverable.
    pub async fn run(&mut self) -> Result<()> {
        let mut sessions = self.start().await?;

        let period = self
            .config
            .status_interval
            .clamp(MIN_STATUS_INTERVAL, MAX_STATUS_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                event = sessions.deployments.next() => {
                    LoopEvent::Workload(WorkloadKind::Deployment, event)
                }
                event = sessions.replication_controllers.next() => {
                    LoopEvent::Workload(WorkloadKind::ReplicationController, event)
                }
                _ = ticker.tick() => LoopEvent::StatusTick,
            };

            let needs_restart = match event {
                LoopEvent::Workload(_, Some(event)) => {
                    self.handle_event(event).await;
                    false
                }
                LoopEvent::Workload(kind, None) => {
                    debug!(kind = %kind, "Watch stream closed");
                    true
                }
                LoopEvent::StatusTick => {
                    self.report_status().await;
                    false
                }
            };

            if needs_restart {
                sessions = self.restart_watches(sessions).await?;
            }
        }
    }

    /// Seed the cache from existing autoscalers, then open the first watch pair
    async fn start(&mut self) -> Result<WatchSessions> {
        self.seed_cache().await?;

        let sessions =
            WatchSessions::open(self.orchestrator.as_ref(), &self.config.selector).await?;

        self.health.register(components::WATCHERS).await;
        self.health.register(components::STATUS_REPORTER).await;
        self.health.set_ready(true).await;
        self.logger.log_startup(VERSION, self.cache.len());

        Ok(sessions)
    }

    /// Record every autoscaler that already exists in the cluster
    pub async fn seed_cache(&mut self) -> Result<()> {
        let existing = self.lifecycle.list_all().await?;

        for record in &existing {
            self.cache.add(&record.name, &record.namespace);
        }

        self.metrics.set_managed_workloads(self.cache.len());
        info!(count = existing.len(), "Seeded autoscaler cache");
        Ok(())
    }

    /// Apply one watch event to the cluster and the cache
    pub(crate) async fn handle_event(&mut self, event: WorkloadEvent) {
        match event {
            WorkloadEvent::Added(workload) => self.on_added(workload).await,
            WorkloadEvent::Deleted(workload) => self.on_deleted(workload).await,
            WorkloadEvent::Modified(workload) => {
                trace!(kind = %workload.kind, name = %workload.name, "Ignoring modification");
            }
        }

        self.metrics.set_managed_workloads(self.cache.len());
    }

    /// Create an autoscaler unless one is already cached; cache the attempt either way
    async fn on_added(&mut self, workload: WorkloadRef) {
        if self.cache.contains(&workload.name, &workload.namespace) {
            debug!(
                kind = %workload.kind,
                name = %workload.name,
                namespace = %workload.namespace,
                "Autoscaler already managed"
            );
            return;
        }

        match self.lifecycle.create(&workload).await {
            Ok(()) => self.metrics.inc_created(workload.kind),
            Err(e) => {
                self.metrics.inc_create_errors(workload.kind);
                self.logger.log_create_failed(
                    workload.kind,
                    &workload.name,
                    &workload.namespace,
                    &e.to_string(),
                );
            }
        }

        self.cache.add(&workload.name, &workload.namespace);
    }

    /// Delete the autoscaler and forget the workload, whatever the outcome
    async fn on_deleted(&mut self, workload: WorkloadRef) {
        match self.lifecycle.delete(&workload.name, &workload.namespace).await {
            Ok(()) => self.metrics.inc_deleted(),
            Err(e) => {
                self.metrics.inc_delete_errors();
                self.logger
                    .log_delete_failed(&workload.name, &workload.namespace, &e.to_string());
            }
        }

        self.cache.remove(&workload.name, &workload.namespace);
    }

    async fn report_status(&mut self) {
        if !self.config.print_status {
            return;
        }

        match self.reporter.report(&self.cache).await {
            Ok(lines) => {
                debug!(lines = lines, "Status report complete");
                self.health.set_healthy(components::STATUS_REPORTER).await;
            }
            Err(e) => {
                self.metrics.inc_status_report_errors();
                warn!(error = %e, "Error printing status");
                self.health
                    .set_degraded(components::STATUS_REPORTER, e.to_string())
                    .await;
            }
        }
    }

    /// Discard the closed pair and open a new one
    async fn restart_watches(&mut self, closed: WatchSessions) -> Result<WatchSessions> {
        drop(closed);

        self.restarts += 1;
        self.metrics.inc_watch_restarts();
        self.logger.log_watch_restart(self.restarts);
        self.health
            .set_degraded(components::WATCHERS, "restarting watch sessions")
            .await;

        match WatchSessions::open(self.orchestrator.as_ref(), &self.config.selector).await {
            Ok(sessions) => {
                self.health.set_healthy(components::WATCHERS).await;
                Ok(sessions)
            }
            Err(e) => {
                self.logger.log_fatal(&e.to_string());
                self.health
                    .set_unhealthy(components::WATCHERS, e.to_string())
                    .await;
                Err(e)
            }
        }
    }
}
