//! Node network.
//!
//! - `registry`: the set of nodes and their last observed health.
//! - `distribution`: fragment-to-node placement.
//! - `monitor`: periodic health polling.
//! - `state`: orchestrator state tracking.
//! - `orchestrator`: [`NodeNetwork`], which ties the above to the engine.

pub mod distribution;
pub mod monitor;
pub mod orchestrator;
pub mod registry;
pub mod state;

pub use distribution::{distribute, Placement};
pub use monitor::{HealthMonitor, MonitorHandle};
pub use orchestrator::{
    FragmentLocation, FragmentMap, NetworkStatus, NodeNetwork, ProtectOutcome, ProtectWarning,
    SecretId,
};
pub use registry::NodeRegistry;
pub use state::NetworkState;

use std::fmt;
use crate::mpc::MpcError;

/// Errors surfaced by the network and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultError {
    /// Threshold, share count, secret or configuration out of range.
    InvalidParameters,
    /// Fewer healthy nodes than the threshold.
    InsufficientNodes,
    /// Fewer than threshold fragments could be stored.
    InsufficientFragmentStorage,
    /// Fewer than threshold fragments could be recovered.
    InsufficientFragments,
    /// Fragments failed verification and the remainder cannot reconstruct.
    IntegrityFailure,
    /// Credential rejected.
    AccessDenied,
    /// No fragment map for the given secret id.
    UnknownSecret,
    /// Catalog JSON could not be parsed or is inconsistent.
    CatalogFormat,
    /// Internal engine failure (randomness, encryption, keys).
    Engine(MpcError),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::InvalidParameters => write!(f, "Invalid parameters"),
            VaultError::InsufficientNodes => write!(f, "Not enough healthy nodes"),
            VaultError::InsufficientFragmentStorage => {
                write!(f, "Too few fragments could be stored")
            }
            VaultError::InsufficientFragments => write!(f, "Too few fragments could be recovered"),
            VaultError::IntegrityFailure => write!(f, "Fragment integrity check failed"),
            VaultError::AccessDenied => write!(f, "Access denied"),
            VaultError::UnknownSecret => write!(f, "Unknown secret"),
            VaultError::CatalogFormat => write!(f, "Malformed fragment catalog"),
            VaultError::Engine(e) => write!(f, "Engine error: {}", e),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<MpcError> for VaultError {
    fn from(err: MpcError) -> Self {
        if err.is_invalid_parameters() {
            return VaultError::InvalidParameters;
        }
        match err {
            MpcError::InsufficientShares => VaultError::InsufficientFragments,
            MpcError::IntegrityFailure | MpcError::ShareLengthMismatch => {
                VaultError::IntegrityFailure
            }
            other => VaultError::Engine(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_mapping() {
        assert_eq!(VaultError::from(MpcError::InvalidThreshold), VaultError::InvalidParameters);
        assert_eq!(VaultError::from(MpcError::DuplicateShareIndex), VaultError::InvalidParameters);
        assert_eq!(
            VaultError::from(MpcError::InsufficientShares),
            VaultError::InsufficientFragments
        );
        assert_eq!(VaultError::from(MpcError::IntegrityFailure), VaultError::IntegrityFailure);
        assert_eq!(
            VaultError::from(MpcError::RngFailure),
            VaultError::Engine(MpcError::RngFailure)
        );
    }
}
