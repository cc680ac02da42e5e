//! Node health classification.

use std::fmt;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use super::NodeId;

/// Coarse health of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Reachable, responsive, with storage headroom. Eligible for placement.
    Healthy,
    /// Reachable but slow or nearly full. Still read from, not placed on.
    Degraded,
    /// Unreachable. Skipped entirely.
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Limits used by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    /// Response delays above this mark a node degraded.
    pub slow_response: Duration,
    /// Free capacity ratio below this marks a node degraded.
    pub min_headroom: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            slow_response: Duration::from_millis(500),
            min_headroom: 0.1,
        }
    }
}

/// Result of one local health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub node_id: NodeId,
    pub status: HealthStatus,
    pub load: usize,
    pub capacity: usize,
    pub response_delay_ms: u64,
    /// Unix seconds.
    pub checked_at: u64,
}

/// Classifies a node from its locally observable state.
pub fn classify(
    thresholds: &HealthThresholds,
    online: bool,
    response_delay: Duration,
    load: usize,
    capacity: usize,
) -> HealthStatus {
    if !online {
        return HealthStatus::Unhealthy;
    }
    if load >= capacity || response_delay > thresholds.slow_response {
        return HealthStatus::Degraded;
    }
    let headroom = (capacity - load) as f64 / capacity as f64;
    if headroom < thresholds.min_headroom {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
