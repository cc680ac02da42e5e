//! fragvault: threshold secret sharing across independent storage nodes.
//!
//! A secret is split into N fragments such that any T of them reconstruct it
//! and fewer than T reveal nothing. Fragments are sealed, committed to and
//! spread over registered nodes; the [`Controller`] is the external entry point.
//!
//! # Modules
//! - `core`: prime field arithmetic.
//! - `entropy`: randomness sources.
//! - `mpc`: splitting and reconstruction.
//! - `fragment`, `keys`: fragment sealing and key custody.
//! - `node`, `storage`: storage nodes and their backends.
//! - `network`: registry, placement, health monitoring and orchestration.
//! - `controller`, `audit`, `auth`, `config`: the external surface.

pub mod core;
pub mod entropy;
pub mod mpc;
pub mod fragment;
pub mod keys;
pub mod auth;
pub mod storage;
pub mod node;
pub mod network;
pub mod audit;
pub mod config;
pub mod controller;

pub use auth::{AccessCredential, Authorizer, TokenAuthorizer};
pub use config::{HealthConfig, VaultConfig};
pub use controller::{Controller, ProtectReceipt};
pub use fragment::Fragment;
pub use keys::{InMemoryKeyManager, KeyManager};
pub use mpc::{MpcError, SecretSharingEngine};
pub use network::{
    FragmentMap, HealthMonitor, NetworkStatus, NodeNetwork, NodeRegistry, SecretId, VaultError,
};
pub use node::{HealthStatus, Node, NodeId};
