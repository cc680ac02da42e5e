//! Node registry.
//!
//! Holds every known node together with the health it last reported. Nodes
//! enter and leave only through [`NodeRegistry::add`] and
//! [`NodeRegistry::remove`]; health is updated by the monitor.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::config::HealthConfig;
use crate::node::{HealthReport, HealthStatus, HealthThresholds, Node, NodeId};

struct Entry {
    node: Arc<Node>,
    health: HealthReport,
}

/// The set of nodes a network can place fragments on.
#[derive(Default)]
pub struct NodeRegistry {
    entries: RwLock<BTreeMap<NodeId, Entry>>,
    thresholds: Option<HealthThresholds>,
}

impl NodeRegistry {
    /// A registry that leaves each node's own health limits alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that applies the configured health limits to every node it admits.
    pub fn from_config(config: &HealthConfig) -> Self {
        Self {
            entries: RwLock::default(),
            thresholds: Some(config.thresholds()),
        }
    }

    /// Registers a node, recording its current health.
    ///
    /// Returns `false` if a node with the same id is already registered.
    pub async fn add(&self, node: Arc<Node>) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(node.id()) {
            log::warn!("Node {} already registered", node.id());
            return false;
        }
        if let Some(thresholds) = self.thresholds {
            node.set_thresholds(thresholds);
        }
        let health = node.health_check();
        log::info!("Registered node {} in zone {} ({})", node.id(), node.zone(), health.status);
        entries.insert(node.id().clone(), Entry { node, health });
        true
    }

    /// Decommissions a node. Fragments it holds are no longer reachable.
    pub async fn remove(&self, id: &NodeId) -> Option<Arc<Node>> {
        let removed = self.entries.write().await.remove(id).map(|e| e.node);
        if removed.is_some() {
            log::info!("Removed node {}", id);
        }
        removed
    }

    pub async fn get(&self, id: &NodeId) -> Option<Arc<Node>> {
        self.entries.read().await.get(id).map(|e| e.node.clone())
    }

    pub async fn nodes(&self) -> Vec<Arc<Node>> {
        self.entries.read().await.values().map(|e| e.node.clone()).collect()
    }

    /// A node together with its last recorded status.
    pub async fn lookup(&self, id: &NodeId) -> Option<(Arc<Node>, HealthStatus)> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|e| (e.node.clone(), e.health.status))
    }

    /// Last recorded status of a node.
    pub async fn status_of(&self, id: &NodeId) -> Option<HealthStatus> {
        self.entries.read().await.get(id).map(|e| e.health.status)
    }

    /// Nodes whose last recorded status is `Healthy`.
    pub async fn healthy_nodes(&self) -> Vec<Arc<Node>> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.health.status == HealthStatus::Healthy)
            .map(|e| e.node.clone())
            .collect()
    }

    pub async fn healthy_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.health.status == HealthStatus::Healthy)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Replaces the recorded health of a node. Returns the previous status, or
    /// `None` if the node is no longer registered.
    pub(crate) async fn record_health(&self, report: HealthReport) -> Option<HealthStatus> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&report.node_id)?;
        let previous = entry.health.status;
        entry.health = report;
        Some(previous)
    }
}
