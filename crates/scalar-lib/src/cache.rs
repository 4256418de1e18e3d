//! Membership cache of workloads that have a managed autoscaler
//!
//! The cache is a belief about control-plane state: it is updated from
//! create/delete attempts, not from their outcome, so failed calls can leave
//! it out of sync until the workload is deleted.

use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Namespace -> set of workload names with a managed autoscaler
#[derive(Debug, Default, Clone)]
pub struct MembershipCache {
    scalars: HashMap<String, HashSet<String>>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a workload; returns false if it was already present
    pub fn add(&mut self, name: &str, namespace: &str) -> bool {
        let inserted = self
            .scalars
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string());

        if inserted {
            debug!(name = %name, namespace = %namespace, "Cached autoscaler");
        }
        inserted
    }

    /// Forget a workload; returns false if it was not present
    pub fn remove(&mut self, name: &str, namespace: &str) -> bool {
        let Some(names) = self.scalars.get_mut(namespace) else {
            return false;
        };

        let removed = names.remove(name);
        if names.is_empty() {
            self.scalars.remove(namespace);
        }

        if removed {
            debug!(name = %name, namespace = %namespace, "Evicted autoscaler");
        }
        removed
    }

    pub fn contains(&self, name: &str, namespace: &str) -> bool {
        self.scalars
            .get(namespace)
            .map(|names| names.contains(name))
            .unwrap_or(false)
    }

    /// Namespaces with at least one cached workload, in no particular order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.scalars.keys().map(String::as_str)
    }

    /// Workload names cached under a namespace
    pub fn names(&self, namespace: &str) -> impl Iterator<Item = &str> {
        self.scalars
            .get(namespace)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// Total number of cached workloads across all namespaces
    pub fn len(&self) -> usize {
        self.scalars.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }
}
