//! Storage nodes.
//!
//! A [`Node`] holds fragments for whichever secrets were routed to it. It owns
//! its [`FragmentBackend`] exclusively; the network only talks to it through
//! `store`, `retrieve`, `delete` and `health_check`.
//!
//! Reachability and response latency are explicit node state (`set_online`,
//! `set_response_delay`), which lets an in-process network model nodes going
//! offline or slowing down.

pub mod health;

pub use health::{HealthReport, HealthStatus, HealthThresholds};

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use crate::auth::{AccessCredential, Authorizer};
use crate::fragment::{hex32, unix_now, ContentHash, Fragment};
use crate::storage::{FragmentBackend, MemoryBackend, StorageError};

/// Errors returned by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// Node is offline.
    Unreachable,
    /// Node did not answer within the caller's deadline.
    Timeout,
    /// Credential rejected.
    AccessDenied,
    /// No fragment under the storage key.
    NotFound,
    /// Node is at capacity.
    CapacityExceeded,
    /// Backend failure.
    Storage(StorageError),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Unreachable => write!(f, "Node unreachable"),
            NodeError::Timeout => write!(f, "Node timed out"),
            NodeError::AccessDenied => write!(f, "Access denied"),
            NodeError::NotFound => write!(f, "Fragment not found"),
            NodeError::CapacityExceeded => write!(f, "Node capacity exceeded"),
            NodeError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<StorageError> for NodeError {
    fn from(err: StorageError) -> Self {
        NodeError::Storage(err)
    }
}

/// Node identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a fragment lives on a node.
///
/// Derived from (content hash, index), which makes stores idempotent: the same
/// fragment always lands under the same key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(#[serde(with = "hex32")] [u8; 32]);

impl StorageKey {
    pub fn derive(content_hash: &ContentHash, index: u8) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("fragvault 2026-01 node storage key");
        hasher.update(&[index]);
        hasher.update(content_hash.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", &self.to_hex()[..16])
    }
}

/// Proof of a successful store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReceipt {
    pub node_id: NodeId,
    pub storage_key: StorageKey,
    pub fragment_index: u8,
    /// Unix seconds.
    pub stored_at: u64,
}

/// A fragment storage node.
pub struct Node {
    id: NodeId,
    zone: String,
    capacity: usize,
    load: AtomicUsize,
    online: AtomicBool,
    response_delay_ms: AtomicU64,
    slow_response_ms: AtomicU64,
    min_headroom_bits: AtomicU64,
    backend: Mutex<Box<dyn FragmentBackend>>,
    authorizer: Arc<dyn Authorizer>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("zone", &self.zone)
            .field("capacity", &self.capacity)
            .field("load", &self.load())
            .field("online", &self.is_online())
            .finish()
    }
}

impl Node {
    /// Creates an online, in-memory node.
    pub fn new(
        id: impl Into<NodeId>,
        zone: impl Into<String>,
        capacity: usize,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let node = Self {
            id: id.into(),
            zone: zone.into(),
            capacity,
            load: AtomicUsize::new(0),
            online: AtomicBool::new(true),
            response_delay_ms: AtomicU64::new(0),
            slow_response_ms: AtomicU64::new(0),
            min_headroom_bits: AtomicU64::new(0),
            backend: Mutex::new(Box::new(MemoryBackend::new())),
            authorizer,
        };
        node.set_thresholds(HealthThresholds::default());
        node
    }

    /// Swaps in a different backend; load is taken from what it already holds.
    pub fn with_backend(mut self, backend: Box<dyn FragmentBackend>) -> Result<Self, NodeError> {
        let existing = backend.len()?;
        log::debug!("Node {} using {} backend with {} fragments", self.id, backend.kind(), existing);
        self.load = AtomicUsize::new(existing);
        self.backend = Mutex::new(backend);
        Ok(self)
    }

    pub fn with_thresholds(self, thresholds: HealthThresholds) -> Self {
        self.set_thresholds(thresholds);
        self
    }

    /// Limits this node classifies its own health against.
    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            slow_response: Duration::from_millis(self.slow_response_ms.load(Ordering::SeqCst)),
            min_headroom: f64::from_bits(self.min_headroom_bits.load(Ordering::SeqCst)),
        }
    }

    /// Replaces the health limits. Takes effect on the next health check.
    pub fn set_thresholds(&self, thresholds: HealthThresholds) {
        let millis = u64::try_from(thresholds.slow_response.as_millis()).unwrap_or(u64::MAX);
        self.slow_response_ms.store(millis, Ordering::SeqCst);
        self.min_headroom_bits.store(thresholds.min_headroom.to_bits(), Ordering::SeqCst);
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn load(&self) -> usize {
        self.load.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Marks the node reachable or unreachable.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms.load(Ordering::SeqCst))
    }

    /// Sets how long each request takes before the node answers.
    pub fn set_response_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.response_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Stores a fragment. Idempotent per (content hash, index).
    pub async fn store(&self, fragment: &Fragment) -> Result<StorageReceipt, NodeError> {
        self.respond().await?;
        let storage_key = StorageKey::derive(&fragment.content_hash, fragment.index);

        let mut backend = self.backend.lock().await;
        if !backend.contains(&storage_key)? {
            if self.load() >= self.capacity {
                return Err(NodeError::CapacityExceeded);
            }
            backend.put(&storage_key, fragment)?;
            self.load.fetch_add(1, Ordering::SeqCst);
        }

        log::debug!("Node {} stored fragment {} under {}", self.id, fragment.index, storage_key);
        Ok(StorageReceipt {
            node_id: self.id.clone(),
            storage_key,
            fragment_index: fragment.index,
            stored_at: unix_now(),
        })
    }

    /// Returns the fragment under `storage_key` to an authorized caller.
    pub async fn retrieve(
        &self,
        storage_key: &StorageKey,
        credential: &AccessCredential,
    ) -> Result<Fragment, NodeError> {
        self.respond().await?;
        if !self.authorizer.authorize(credential) {
            log::warn!("Node {} rejected credential for {}", self.id, storage_key);
            return Err(NodeError::AccessDenied);
        }
        let backend = self.backend.lock().await;
        backend.get(storage_key)?.ok_or(NodeError::NotFound)
    }

    /// Deletes the fragment under `storage_key`. Deleting a missing key succeeds.
    pub async fn delete(
        &self,
        storage_key: &StorageKey,
        credential: &AccessCredential,
    ) -> Result<(), NodeError> {
        self.respond().await?;
        if !self.authorizer.authorize(credential) {
            return Err(NodeError::AccessDenied);
        }
        self.remove_entry(storage_key).await
    }

    /// Removes a fragment this network placed moments ago, without a
    /// credential. Used to roll back a protect that could not complete.
    pub(crate) async fn evict(&self, storage_key: &StorageKey) -> Result<(), NodeError> {
        self.respond().await?;
        self.remove_entry(storage_key).await
    }

    /// Local, side-effect-free health read.
    pub fn health_check(&self) -> HealthReport {
        let load = self.load();
        let delay = self.response_delay();
        let status = health::classify(&self.thresholds(), self.is_online(), delay, load, self.capacity);
        HealthReport {
            node_id: self.id.clone(),
            status,
            load,
            capacity: self.capacity,
            response_delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            checked_at: unix_now(),
        }
    }

    async fn remove_entry(&self, storage_key: &StorageKey) -> Result<(), NodeError> {
        let mut backend = self.backend.lock().await;
        if backend.remove(storage_key)? {
            self.load.fetch_sub(1, Ordering::SeqCst);
            log::debug!("Node {} removed {}", self.id, storage_key);
        }
        Ok(())
    }

    /// Models the request round trip: offline nodes fail, slow nodes wait.
    async fn respond(&self) -> Result<(), NodeError> {
        if !self.is_online() {
            return Err(NodeError::Unreachable);
        }
        let delay = self.response_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
