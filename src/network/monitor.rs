//! Health monitor.
//!
//! Polls every registered node, keeps a bounded history of reports per node
//! and writes the latest status into the registry. The registry snapshot is
//! what placement and retrieval read.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use crate::config::HealthConfig;
use crate::node::{HealthReport, HealthStatus, HealthThresholds, Node, NodeId};
use super::registry::NodeRegistry;

pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    depth: usize,
    interval: Duration,
    thresholds: Option<HealthThresholds>,
    history: Mutex<HashMap<NodeId, VecDeque<HealthReport>>>,
}

impl HealthMonitor {
    /// `depth` is the number of reports kept per node (at least one). Nodes
    /// are classified against their own limits and polled at the default interval.
    pub fn new(registry: Arc<NodeRegistry>, depth: usize) -> Self {
        Self {
            registry,
            depth: depth.max(1),
            interval: HealthConfig::default().interval,
            thresholds: None,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// A monitor polling at `config.interval`, keeping `config.history_depth`
    /// reports and holding every node to the configured limits.
    pub fn from_config(registry: Arc<NodeRegistry>, config: &HealthConfig) -> Self {
        Self {
            interval: config.interval,
            thresholds: Some(config.thresholds()),
            ..Self::new(registry, config.history_depth)
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Checks every registered node once.
    pub async fn poll_once(&self) -> Vec<HealthReport> {
        let nodes = self.registry.nodes().await;
        self.forget_removed(&nodes);
        let mut reports = Vec::with_capacity(nodes.len());

        for node in nodes {
            if let Some(thresholds) = self.thresholds {
                node.set_thresholds(thresholds);
            }
            let report = node.health_check();
            self.remember(&report);

            let previous = self.registry.record_health(report.clone()).await;
            if previous.is_some_and(|p| p != report.status) {
                match report.status {
                    HealthStatus::Healthy => {
                        log::info!("Node {} recovered", report.node_id);
                    }
                    status => log::warn!(
                        "Node {} is {} (load {}/{}, delay {}ms)",
                        report.node_id,
                        status,
                        report.load,
                        report.capacity,
                        report.response_delay_ms
                    ),
                }
            }
            reports.push(report);
        }
        reports
    }

    /// Recorded reports for a node, oldest first.
    pub fn history(&self, id: &NodeId) -> Vec<HealthReport> {
        self.history
            .lock()
            .map(|h| {
                h.get(id)
                    .map(|samples| samples.iter().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Polls on the configured interval until the handle is shut down.
    pub fn spawn(self: Arc<Self>) -> MonitorHandle {
        let interval = self.interval;
        let (shutdown, mut stop) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            log::info!("Health monitor started, interval {:?}", interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }
                    _ = stop.changed() => break,
                }
            }
            log::info!("Health monitor stopped");
        });
        MonitorHandle { shutdown, task }
    }

    /// Drops history of nodes that have left the registry.
    fn forget_removed(&self, nodes: &[Arc<Node>]) {
        let Ok(mut history) = self.history.lock() else {
            return;
        };
        history.retain(|id, _| nodes.iter().any(|n| n.id() == id));
    }

    fn remember(&self, report: &HealthReport) {
        let Ok(mut history) = self.history.lock() else {
            return;
        };
        let samples = history.entry(report.node_id.clone()).or_default();
        if samples.len() == self.depth {
            samples.pop_front();
        }
        samples.push_back(report.clone());
    }
}

/// Handle to a spawned monitor task.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stops the task and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::warn!("Health monitor task ended abnormally: {}", e);
        }
    }
}
