//! Autoscaler controller library
//!
//! Keeps one HorizontalPodAutoscaler per watched Deployment or
//! ReplicationController:
//! - Membership cache of managed workloads
//! - Autoscaler creation, deletion and status listing
//! - Watch/timer reconciliation loop with watch restarts
//! - Health checks, metrics and structured logging

pub mod api;
pub mod autoscaler;
pub mod cache;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod reconciler;
pub mod status;

pub use autoscaler::AutoscalerLifecycle;
pub use cache::MembershipCache;
pub use error::{ClientError, Result, ScalarError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{ScalarMetrics, StructuredLogger};
pub use orchestrator::{KubeOrchestrator, Orchestrator, WatchStream};
pub use reconciler::{Reconciler, ReconcilerBuilder, ReconcilerConfig, MAX_STATUS_INTERVAL};
pub use status::StatusReporter;
