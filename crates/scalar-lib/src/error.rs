//! Error types for the controller core

use crate::models::WorkloadKind;
use thiserror::Error;

/// Failure reported by the orchestration client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Errors produced by the controller core
#[derive(Debug, Error)]
pub enum ScalarError {
    #[error("failed to create autoscaler for {kind} {name} in {namespace}: {source}")]
    Creation {
        kind: WorkloadKind,
        name: String,
        namespace: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to delete autoscaler {name} in {namespace}: {source}")]
    Deletion {
        name: String,
        namespace: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to list autoscalers in {namespace}: {source}")]
    List {
        namespace: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to establish {kind} watch: {source}")]
    Watch {
        kind: WorkloadKind,
        #[source]
        source: ClientError,
    },

    #[error("failed to seed autoscaler cache: {0}")]
    Seed(#[source] ClientError),

    #[error("failed to write status: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScalarError>;
