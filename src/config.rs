//! Configuration management for fragvault.
//!
//! Defines the structure for user-configurable settings.

use std::time::Duration;
use crate::core::MODULUS;
use crate::mpc::quorum::MAX_SHARES;
use crate::network::VaultError;
use crate::node::HealthThresholds;

/// Main configuration structure.
///
/// Populated by the host application and passed to [`Controller`](crate::Controller)
/// or [`NodeNetwork`](crate::network::NodeNetwork).
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Fragments needed to reconstruct (T).
    pub threshold: usize,

    /// Fragments produced per secret (N).
    pub shares: usize,

    /// Deadline for a single node call during fan-out.
    pub node_timeout: Duration,

    /// Health monitoring.
    pub health: HealthConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            shares: 5,
            node_timeout: Duration::from_secs(2),
            health: HealthConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Prime modulus of the sharing field. Fixed.
    pub fn field_modulus(&self) -> u64 {
        MODULUS
    }

    /// Rejects values the network cannot operate with.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.threshold == 0 || self.threshold > self.shares || self.shares > MAX_SHARES {
            return Err(VaultError::InvalidParameters);
        }
        if self.node_timeout.is_zero() {
            return Err(VaultError::InvalidParameters);
        }
        self.health.validate()
    }
}

/// Configuration specific to health monitoring.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Time between monitor polls.
    pub interval: Duration,

    /// Reports kept per node.
    pub history_depth: usize,

    /// Nodes answering slower than this are degraded.
    pub slow_response: Duration,

    /// Nodes with a smaller free capacity ratio are degraded.
    pub min_headroom: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            history_depth: 32,
            slow_response: Duration::from_millis(500),
            min_headroom: 0.1,
        }
    }
}

impl HealthConfig {
    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            slow_response: self.slow_response,
            min_headroom: self.min_headroom,
        }
    }

    fn validate(&self) -> Result<(), VaultError> {
        let headroom_ok = (0.0..1.0).contains(&self.min_headroom);
        if self.interval.is_zero() || self.history_depth == 0 || !headroom_ok {
            return Err(VaultError::InvalidParameters);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.threshold, 3);
        assert_eq!(config.shares, 5);
        assert_eq!(config.field_modulus(), (1u64 << 61) - 1);
        assert_eq!(config.health.thresholds(), HealthThresholds::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            VaultConfig { threshold: 0, ..Default::default() },
            VaultConfig { threshold: 6, ..Default::default() },
            VaultConfig { shares: 256, threshold: 3, ..Default::default() },
            VaultConfig { node_timeout: Duration::ZERO, ..Default::default() },
            VaultConfig {
                health: HealthConfig { history_depth: 0, ..Default::default() },
                ..Default::default()
            },
            VaultConfig {
                health: HealthConfig { min_headroom: 1.5, ..Default::default() },
                ..Default::default()
            },
        ];
        for config in bad {
            assert_eq!(config.validate(), Err(VaultError::InvalidParameters), "{:?}", config);
        }
    }
}
