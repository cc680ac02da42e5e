//! Node network orchestration.
//!
//! [`NodeNetwork`] places the fragments of a secret on registered nodes and
//! collects them back.
//!
//! # Protect
//! Split, place on the healthy nodes, then store on every assigned node
//! concurrently, each call bounded by `node_timeout`. Fewer than threshold
//! successful stores fails the call and removes what was stored. A map is
//! only returned once at least threshold fragments are in place.
//!
//! # Retrieve
//! Fetch from the healthy nodes in the map first, and from degraded nodes
//! only if that does not yield threshold verified fragments. Unhealthy nodes
//! are skipped. Every fetched fragment is checked against the map and opened;
//! fragments that fail are excluded and logged.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;
use crate::auth::AccessCredential;
use crate::config::VaultConfig;
use crate::entropy::{EntropySource, OsEntropy};
use crate::fragment::{hex32, unix_now, ContentHash, Fragment};
use crate::mpc::share::Share;
use crate::mpc::{MpcError, SecretSharingEngine};
use crate::node::{HealthStatus, Node, NodeError, NodeId, StorageKey};
use super::distribution::distribute;
use super::monitor::HealthMonitor;
use super::registry::NodeRegistry;
use super::state::{NetworkState, StateTracker};
use super::VaultError;

/// One-way identifier of a protected secret.
///
/// Derived from the owner and a random salt; never from the secret itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(#[serde(with = "hex32")] [u8; 32]);

impl SecretId {
    pub fn derive(owner_id: &str, salt: &[u8; 16]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("fragvault 2026-01 secret id");
        hasher.update(&(owner_id.len() as u64).to_le_bytes());
        hasher.update(owner_id.as_bytes());
        hasher.update(salt);
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses the 64-character hex form.
    pub fn from_hex(text: &str) -> Option<Self> {
        let raw = hex::decode(text).ok()?;
        raw.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretId({})", &self.to_hex()[..16])
    }
}

/// Where one fragment of a secret was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentLocation {
    pub index: u8,
    pub node_id: NodeId,
    pub storage_key: StorageKey,
    pub content_hash: ContentHash,
}

/// Everything needed to collect a secret back. Written once, at protect time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentMap {
    pub secret_id: SecretId,
    pub threshold: usize,
    /// Fragments produced by the split (N), not necessarily all stored.
    pub share_count: usize,
    /// Unix seconds.
    pub created_at: u64,
    /// Some node holds more than one fragment.
    pub degraded: bool,
    /// Sorted by fragment index.
    pub locations: Vec<FragmentLocation>,
}

impl FragmentMap {
    /// Structural checks for maps that come from outside (e.g. a catalog).
    pub fn is_consistent(&self) -> bool {
        if self.threshold == 0
            || self.threshold > self.share_count
            || self.locations.len() < self.threshold
            || self.locations.len() > self.share_count
        {
            return false;
        }
        let mut indices: Vec<u8> = self.locations.iter().map(|l| l.index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices.len() == self.locations.len()
            && indices.iter().all(|&i| i != 0 && usize::from(i) <= self.share_count)
    }
}

/// Non-fatal conditions reported by a successful protect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectWarning {
    /// Fewer healthy nodes than fragments; some node holds several.
    DegradedDistribution { nodes: usize, fragments: usize },
    /// Some stores failed; fewer fragments than requested are in place.
    ReducedRedundancy { stored: usize, requested: usize },
}

impl fmt::Display for ProtectWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectWarning::DegradedDistribution { nodes, fragments } => write!(
                f,
                "{} fragments placed on {} nodes; a single node may expose more than one",
                fragments, nodes
            ),
            ProtectWarning::ReducedRedundancy { stored, requested } => {
                write!(f, "only {} of {} fragments stored", stored, requested)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtectOutcome {
    pub map: FragmentMap,
    pub warnings: Vec<ProtectWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub state: NetworkState,
    pub healthy_node_count: usize,
    pub total_node_count: usize,
    pub required_threshold: usize,
}

#[derive(Default)]
struct Collection {
    shares: Vec<Share>,
    attempted: usize,
    denied: usize,
    tampered: usize,
}

/// Orchestrates fragment placement and collection across a [`NodeRegistry`].
pub struct NodeNetwork {
    registry: Arc<NodeRegistry>,
    engine: SecretSharingEngine,
    config: VaultConfig,
    state: StateTracker,
    rng: Mutex<Box<dyn EntropySource + Send>>,
}

impl NodeNetwork {
    pub fn new(
        registry: Arc<NodeRegistry>,
        engine: SecretSharingEngine,
        config: VaultConfig,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        Ok(Self {
            registry,
            engine,
            config,
            state: StateTracker::new(),
            rng: Mutex::new(Box::new(OsEntropy)),
        })
    }

    /// Replaces the randomness used for splitting.
    pub fn with_entropy(mut self, rng: Box<dyn EntropySource + Send>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// A health monitor over this network's registry, driven by `config.health`.
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::from_config(self.registry.clone(), &self.config.health)
    }

    /// Current state, without re-reading node health.
    pub fn state(&self) -> NetworkState {
        self.state.state()
    }

    pub async fn status(&self) -> NetworkStatus {
        let healthy = self.registry.healthy_count().await;
        let total = self.registry.len().await;
        let state = self.state.refresh(healthy, self.config.threshold);
        NetworkStatus {
            state,
            healthy_node_count: healthy,
            total_node_count: total,
            required_threshold: self.config.threshold,
        }
    }

    /// Splits `secret` and stores its fragments across the healthy nodes.
    pub async fn protect(
        &self,
        secret_id: SecretId,
        secret: &[u8],
    ) -> Result<ProtectOutcome, VaultError> {
        let threshold = self.config.threshold;
        let shares = self.config.shares;

        let healthy = self.registry.healthy_nodes().await;
        self.state.refresh(healthy.len(), threshold);
        let _op = self.state.begin_distributing()?;

        let fragments = self.split(secret)?;
        let hashes: Vec<ContentHash> = fragments.iter().map(|f| f.content_hash).collect();
        let Some(placement) = distribute(fragments, &healthy) else {
            self.discard_keys(&hashes);
            return Err(VaultError::InsufficientNodes);
        };

        let deadline = self.config.node_timeout;
        let results = join_all(placement.assignments.iter().map(|(fragment, node)| async move {
            let result = with_deadline(deadline, node.store(fragment)).await;
            (fragment, node, result)
        }))
        .await;

        let mut locations = Vec::with_capacity(results.len());
        let mut placed = Vec::with_capacity(results.len());
        let mut unplaced = Vec::new();
        for (fragment, node, result) in results {
            match result {
                Ok(receipt) => {
                    placed.push((node.clone(), receipt.storage_key));
                    locations.push(FragmentLocation {
                        index: fragment.index,
                        node_id: receipt.node_id,
                        storage_key: receipt.storage_key,
                        content_hash: fragment.content_hash,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Storing fragment {} of {} on node {} failed: {}",
                        fragment.index,
                        secret_id,
                        node.id(),
                        e
                    );
                    unplaced.push(fragment.content_hash);
                }
            }
        }

        if locations.len() < threshold {
            log::warn!(
                "Only {} of {} fragments of {} stored, threshold {}; rolling back",
                locations.len(),
                shares,
                secret_id,
                threshold
            );
            self.evict(&placed).await;
            self.discard_keys(&hashes);
            return Err(VaultError::InsufficientFragmentStorage);
        }
        self.discard_keys(&unplaced);

        let mut warnings = Vec::new();
        if placement.degraded {
            warnings.push(ProtectWarning::DegradedDistribution {
                nodes: healthy.len(),
                fragments: shares,
            });
        }
        if locations.len() < shares {
            warnings.push(ProtectWarning::ReducedRedundancy {
                stored: locations.len(),
                requested: shares,
            });
        }
        for warning in &warnings {
            log::warn!("Protect {}: {}", secret_id, warning);
        }

        locations.sort_by_key(|l| l.index);
        log::info!(
            "Protected {} as {} fragments, threshold {}",
            secret_id,
            locations.len(),
            threshold
        );
        Ok(ProtectOutcome {
            map: FragmentMap {
                secret_id,
                threshold,
                share_count: shares,
                created_at: unix_now(),
                degraded: placement.degraded,
                locations,
            },
            warnings,
        })
    }

    /// Collects and verifies fragments, then reconstructs the secret.
    pub async fn retrieve(
        &self,
        map: &FragmentMap,
        credential: &AccessCredential,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        if !map.is_consistent() {
            return Err(VaultError::InvalidParameters);
        }
        let _op = self.state.begin_collecting();

        let mut preferred = Vec::new();
        let mut fallback = Vec::new();
        for location in &map.locations {
            match self.registry.lookup(&location.node_id).await {
                Some((node, HealthStatus::Healthy)) => preferred.push((location, node)),
                Some((node, HealthStatus::Degraded)) => fallback.push((location, node)),
                Some((_, HealthStatus::Unhealthy)) => {
                    log::debug!("Skipping unhealthy node {}", location.node_id);
                }
                None => log::debug!("Node {} is no longer registered", location.node_id),
            }
        }

        let mut tally = Collection::default();
        for wave in [preferred, fallback] {
            if tally.shares.len() >= map.threshold {
                break;
            }
            self.collect(&wave, credential, &mut tally).await;
        }

        let Collection { shares, attempted, denied, tampered } = tally;
        let verified = shares.len();
        if verified >= map.threshold {
            let secret = SecretSharingEngine::reconstruct_shares(shares, map.threshold)?;
            log::info!("Retrieved {} from {} verified fragments", map.secret_id, verified);
            return Ok(secret);
        }

        log::warn!(
            "Retrieve {}: {} verified of {} needed ({} attempted, {} denied, {} excluded)",
            map.secret_id,
            verified,
            map.threshold,
            attempted,
            denied,
            tampered
        );
        if attempted > 0 && denied == attempted {
            Err(VaultError::AccessDenied)
        } else if tampered > 0 {
            Err(VaultError::IntegrityFailure)
        } else {
            Err(VaultError::InsufficientFragments)
        }
    }

    /// Deletes every fragment in `map` from its node and destroys the keys.
    ///
    /// Returns the number of node deletions that succeeded. Fragments on nodes
    /// that could not be reached stay behind but can no longer be opened.
    pub async fn discard(
        &self,
        map: &FragmentMap,
        credential: &AccessCredential,
    ) -> Result<usize, VaultError> {
        let _op = self.state.begin_collecting();

        let mut targets = Vec::with_capacity(map.locations.len());
        for location in &map.locations {
            if let Some((node, _)) = self.registry.lookup(&location.node_id).await {
                targets.push((location, node));
            }
        }

        let deadline = self.config.node_timeout;
        let results = join_all(targets.iter().map(|(location, node)| async move {
            let result = with_deadline(deadline, node.delete(&location.storage_key, credential)).await;
            (*location, result)
        }))
        .await;

        let attempted = results.len();
        let mut removed = 0;
        let mut denied = 0;
        for (location, result) in results {
            match result {
                Ok(()) => removed += 1,
                Err(NodeError::AccessDenied) => denied += 1,
                Err(e) => log::warn!(
                    "Deleting fragment {} from node {} failed: {}",
                    location.index,
                    location.node_id,
                    e
                ),
            }
        }
        if attempted > 0 && denied == attempted {
            return Err(VaultError::AccessDenied);
        }

        let hashes: Vec<ContentHash> = map.locations.iter().map(|l| l.content_hash).collect();
        self.discard_keys(&hashes);
        log::info!("Discarded {} ({} of {} fragments removed)", map.secret_id, removed, map.locations.len());
        Ok(removed)
    }

    fn split(&self, secret: &[u8]) -> Result<Vec<Fragment>, VaultError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| VaultError::Engine(MpcError::RngFailure))?;
        Ok(self
            .engine
            .split(secret, self.config.shares, self.config.threshold, &mut **rng)?)
    }

    async fn collect(
        &self,
        wave: &[(&FragmentLocation, Arc<Node>)],
        credential: &AccessCredential,
        tally: &mut Collection,
    ) {
        let deadline = self.config.node_timeout;
        let results = join_all(wave.iter().map(|(location, node)| async move {
            let result = with_deadline(deadline, node.retrieve(&location.storage_key, credential)).await;
            (*location, node, result)
        }))
        .await;

        tally.attempted += results.len();
        for (location, node, result) in results {
            match result {
                Ok(fragment) => match self.verify(location, &fragment) {
                    Ok(share) => tally.shares.push(share),
                    Err(MpcError::KeyUnavailable) => {
                        log::warn!("No key for fragment {} on node {}", location.index, node.id());
                    }
                    Err(e) => {
                        tally.tampered += 1;
                        log::warn!(
                            "Excluding fragment {} from node {}: {}",
                            location.index,
                            node.id(),
                            e
                        );
                    }
                },
                Err(NodeError::AccessDenied) => {
                    tally.denied += 1;
                    log::warn!("Node {} denied access to fragment {}", node.id(), location.index);
                }
                Err(e) => log::warn!(
                    "Fetching fragment {} from node {} failed: {}",
                    location.index,
                    node.id(),
                    e
                ),
            }
        }
    }

    fn verify(&self, location: &FragmentLocation, fragment: &Fragment) -> Result<Share, MpcError> {
        if fragment.index != location.index || fragment.content_hash != location.content_hash {
            return Err(MpcError::IntegrityFailure);
        }
        self.engine.open(fragment)
    }

    async fn evict(&self, placed: &[(Arc<Node>, StorageKey)]) {
        let deadline = self.config.node_timeout;
        let results = join_all(placed.iter().map(|(node, key)| async move {
            (node, with_deadline(deadline, node.evict(key)).await)
        }))
        .await;
        for (node, result) in results {
            if let Err(e) = result {
                log::warn!("Rollback on node {} failed: {}", node.id(), e);
            }
        }
    }

    fn discard_keys(&self, hashes: &[ContentHash]) {
        for hash in hashes {
            self.engine.discard(hash);
        }
    }
}

async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, NodeError>
where
    F: Future<Output = Result<T, NodeError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(NodeError::Timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenAuthorizer;
    use crate::config::HealthConfig;
    use crate::entropy::testing::FailingEntropy;
    use crate::keys::InMemoryKeyManager;
    use crate::storage::{FragmentBackend, MemoryBackend, StorageError};

    const SECRET: &[u8] = b"hello-vault";

    struct Fixture {
        network: NodeNetwork,
        nodes: Vec<Arc<Node>>,
        keys: Arc<InMemoryKeyManager>,
    }

    fn reader() -> AccessCredential {
        AccessCredential::new("reader")
    }

    fn config() -> VaultConfig {
        VaultConfig {
            node_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    fn node(i: usize) -> Node {
        Node::new(
            format!("node-{}", i),
            format!("zone-{}", i % 3),
            100,
            Arc::new(TokenAuthorizer::with_tokens(["reader"])),
        )
    }

    async fn fixture_with(nodes: Vec<Node>, config: VaultConfig) -> Fixture {
        let registry = Arc::new(NodeRegistry::from_config(&config.health));
        let nodes: Vec<Arc<Node>> = nodes.into_iter().map(Arc::new).collect();
        for n in &nodes {
            registry.add(n.clone()).await;
        }
        let keys = Arc::new(InMemoryKeyManager::new());
        let engine = SecretSharingEngine::new(keys.clone());
        let network = NodeNetwork::new(registry, engine, config).unwrap();
        Fixture { network, nodes, keys }
    }

    async fn fixture(count: usize) -> Fixture {
        fixture_with((0..count).map(node).collect(), config()).await
    }

    async fn poll(fixture: &Fixture) {
        fixture.network.health_monitor().poll_once().await;
    }

    fn secret_id() -> SecretId {
        SecretId::derive("alice", &[7; 16])
    }

    /// Flips the last payload byte of every fragment it returns.
    #[derive(Default)]
    struct FlippingBackend(MemoryBackend);

    impl FragmentBackend for FlippingBackend {
        fn kind(&self) -> &'static str {
            "flipping"
        }

        fn put(&mut self, key: &StorageKey, fragment: &Fragment) -> Result<(), StorageError> {
            self.0.put(key, fragment)
        }

        fn get(&self, key: &StorageKey) -> Result<Option<Fragment>, StorageError> {
            Ok(self.0.get(key)?.map(|mut fragment| {
                if let Some(last) = fragment.payload.last_mut() {
                    *last ^= 1;
                }
                fragment
            }))
        }

        fn remove(&mut self, key: &StorageKey) -> Result<bool, StorageError> {
            self.0.remove(key)
        }

        fn contains(&self, key: &StorageKey) -> Result<bool, StorageError> {
            self.0.contains(key)
        }

        fn len(&self) -> Result<usize, StorageError> {
            self.0.len()
        }
    }

    #[tokio::test]
    async fn test_hello_vault_round_trip() {
        let f = fixture(5).await;
        assert_eq!(f.network.status().await.state, NetworkState::Ready);

        let outcome = f.network.protect(secret_id(), SECRET).await.unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.map.locations.len(), 5);
        assert_eq!(outcome.map.threshold, 3);
        assert!(!outcome.map.degraded);
        assert_eq!(f.keys.len(), 5);

        let secret = f.network.retrieve(&outcome.map, &reader()).await.unwrap();
        assert_eq!(secret.as_slice(), SECRET);
        assert_eq!(f.network.state(), NetworkState::Ready);
    }

    #[tokio::test]
    async fn test_fragments_isolated_per_node() {
        let f = fixture(5).await;
        let outcome = f.network.protect(secret_id(), SECRET).await.unwrap();
        for n in &f.nodes {
            assert_eq!(n.load(), 1);
        }
        let mut holders: Vec<_> = outcome.map.locations.iter().map(|l| l.node_id.clone()).collect();
        holders.sort();
        holders.dedup();
        assert_eq!(holders.len(), 5);
    }

    #[tokio::test]
    async fn test_survives_any_two_nodes_offline() {
        let f = fixture(5).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;

        for a in 0..5 {
            for b in (a + 1)..5 {
                f.nodes[a].set_online(false);
                f.nodes[b].set_online(false);
                poll(&f).await;

                let secret = f.network.retrieve(&map, &reader()).await.unwrap();
                assert_eq!(secret.as_slice(), SECRET, "offline: {} {}", a, b);

                f.nodes[a].set_online(true);
                f.nodes[b].set_online(true);
            }
        }
    }

    #[tokio::test]
    async fn test_three_nodes_offline_is_insufficient() {
        let f = fixture(5).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;
        for n in &f.nodes[..3] {
            n.set_online(false);
        }
        // Stale snapshot: the offline nodes are still attempted and fail.
        assert_eq!(
            f.network.retrieve(&map, &reader()).await,
            Err(VaultError::InsufficientFragments)
        );
        poll(&f).await;
        assert_eq!(
            f.network.retrieve(&map, &reader()).await,
            Err(VaultError::InsufficientFragments)
        );
    }

    #[tokio::test]
    async fn test_degraded_nodes_used_as_fallback() {
        let f = fixture_with((0..5).map(node).collect(), VaultConfig::default()).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;
        f.nodes[0].set_online(false);
        f.nodes[1].set_online(false);
        f.nodes[2].set_response_delay(Duration::from_millis(600));
        poll(&f).await;

        // Two healthy nodes are not enough; the slow node fills in.
        let secret = f.network.retrieve(&map, &reader()).await.unwrap();
        assert_eq!(secret.as_slice(), SECRET);
    }

    #[tokio::test]
    async fn test_insufficient_nodes() {
        let f = fixture(2).await;
        assert_eq!(
            f.network.protect(secret_id(), SECRET).await.err(),
            Some(VaultError::InsufficientNodes)
        );
        assert_eq!(f.network.state(), NetworkState::Uninitialized);
        assert!(f.keys.is_empty());

        let f = fixture(5).await;
        for n in &f.nodes[..3] {
            n.set_online(false);
        }
        poll(&f).await;
        assert_eq!(
            f.network.protect(secret_id(), SECRET).await.err(),
            Some(VaultError::InsufficientNodes)
        );
    }

    #[tokio::test]
    async fn test_degraded_distribution_warns() {
        let f = fixture(3).await;
        let outcome = f.network.protect(secret_id(), SECRET).await.unwrap();
        assert!(outcome.map.degraded);
        assert_eq!(
            outcome.warnings,
            vec![ProtectWarning::DegradedDistribution { nodes: 3, fragments: 5 }]
        );
        assert_eq!(outcome.map.locations.len(), 5);

        let secret = f.network.retrieve(&outcome.map, &reader()).await.unwrap();
        assert_eq!(secret.as_slice(), SECRET);
    }

    #[tokio::test]
    async fn test_reduced_redundancy_when_a_store_fails() {
        let f = fixture(5).await;
        // Registry still believes the node is healthy.
        f.nodes[4].set_online(false);

        let outcome = f.network.protect(secret_id(), SECRET).await.unwrap();
        assert_eq!(
            outcome.warnings,
            vec![ProtectWarning::ReducedRedundancy { stored: 4, requested: 5 }]
        );
        assert_eq!(outcome.map.locations.len(), 4);
        assert_eq!(f.keys.len(), 4);
        assert!(outcome.map.is_consistent());
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back() {
        let f = fixture(5).await;
        for n in &f.nodes[..3] {
            n.set_online(false);
        }

        assert_eq!(
            f.network.protect(secret_id(), SECRET).await.err(),
            Some(VaultError::InsufficientFragmentStorage)
        );
        for n in &f.nodes[3..] {
            assert_eq!(n.load(), 0);
        }
        assert!(f.keys.is_empty());
        assert_eq!(f.network.state(), NetworkState::Ready);
    }

    #[tokio::test]
    async fn test_slow_node_times_out() {
        let f = fixture(5).await;
        f.nodes[0].set_response_delay(Duration::from_secs(1));

        let outcome = f.network.protect(secret_id(), SECRET).await.unwrap();
        assert_eq!(outcome.map.locations.len(), 4);
        assert!(outcome.map.locations.iter().all(|l| &l.node_id != f.nodes[0].id()));
        assert_eq!(f.nodes[0].load(), 0);
    }

    #[tokio::test]
    async fn test_access_denied() {
        let f = fixture(5).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;
        assert_eq!(
            f.network.retrieve(&map, &AccessCredential::new("intruder")).await,
            Err(VaultError::AccessDenied)
        );
        assert_eq!(
            f.network.discard(&map, &AccessCredential::new("intruder")).await,
            Err(VaultError::AccessDenied)
        );
        assert_eq!(f.keys.len(), 5);
    }

    #[tokio::test]
    async fn test_tampered_fragments_excluded() {
        let mut nodes: Vec<Node> = (0..5).map(node).collect();
        nodes[0] = node(0)
            .with_backend(Box::new(FlippingBackend::default()))
            .unwrap();
        let f = fixture_with(nodes, config()).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;

        let secret = f.network.retrieve(&map, &reader()).await.unwrap();
        assert_eq!(secret.as_slice(), SECRET);
    }

    #[tokio::test]
    async fn test_tampering_below_threshold_is_integrity_failure() {
        let nodes: Vec<Node> = (0..5)
            .map(|i| {
                if i < 3 {
                    node(i).with_backend(Box::new(FlippingBackend::default())).unwrap()
                } else {
                    node(i)
                }
            })
            .collect();
        let f = fixture_with(nodes, config()).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;
        assert_eq!(
            f.network.retrieve(&map, &reader()).await,
            Err(VaultError::IntegrityFailure)
        );
    }

    #[tokio::test]
    async fn test_map_mismatch_is_excluded() {
        let f = fixture(5).await;
        let mut map = f.network.protect(secret_id(), SECRET).await.unwrap().map;
        map.locations[0].content_hash = map.locations[1].content_hash;
        let secret = f.network.retrieve(&map, &reader()).await.unwrap();
        assert_eq!(secret.as_slice(), SECRET);
    }

    #[tokio::test]
    async fn test_discard() {
        let f = fixture(5).await;
        let map = f.network.protect(secret_id(), SECRET).await.unwrap().map;
        f.nodes[0].set_online(false);

        assert_eq!(f.network.discard(&map, &reader()).await, Ok(4));
        assert!(f.keys.is_empty());
        f.nodes[0].set_online(true);
        assert_eq!(f.nodes[0].load(), 1);
        assert_eq!(
            f.network.retrieve(&map, &reader()).await,
            Err(VaultError::InsufficientFragments)
        );
    }

    #[tokio::test]
    async fn test_rng_failure_returns_to_ready() {
        let f = fixture(5).await;
        let network = f.network.with_entropy(Box::new(FailingEntropy));
        assert_eq!(
            network.protect(secret_id(), SECRET).await.err(),
            Some(VaultError::Engine(MpcError::RngFailure))
        );
        assert_eq!(network.state(), NetworkState::Ready);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let f = fixture(5).await;
        f.nodes[0].set_online(false);
        f.nodes[1].set_response_delay(Duration::from_secs(1));
        poll(&f).await;
        let status = f.network.status().await;
        assert_eq!(status.healthy_node_count, 3);
        assert_eq!(status.total_node_count, 5);
        assert_eq!(status.required_threshold, 3);
        assert_eq!(status.state, NetworkState::Ready);
    }

    #[tokio::test]
    async fn test_health_config_sets_slow_limit() {
        let relaxed = fixture(5).await;
        for n in &relaxed.nodes[..3] {
            n.set_response_delay(Duration::from_millis(150));
        }
        poll(&relaxed).await;
        assert_eq!(relaxed.network.status().await.healthy_node_count, 5);

        let strict = VaultConfig {
            health: HealthConfig {
                slow_response: Duration::from_millis(100),
                ..HealthConfig::default()
            },
            ..config()
        };
        let f = fixture_with((0..5).map(node).collect(), strict).await;
        for n in &f.nodes[..3] {
            n.set_response_delay(Duration::from_millis(150));
        }
        poll(&f).await;
        let status = f.network.status().await;
        assert_eq!(status.healthy_node_count, 2);
        assert_eq!(status.state, NetworkState::Uninitialized);
        assert_eq!(
            f.network.protect(secret_id(), SECRET).await.err(),
            Some(VaultError::InsufficientNodes)
        );
    }

    #[test]
    fn test_secret_id_derivation() {
        let a = SecretId::derive("alice", &[1; 16]);
        assert_eq!(a, SecretId::derive("alice", &[1; 16]));
        assert_ne!(a, SecretId::derive("alice", &[2; 16]));
        assert_ne!(a, SecretId::derive("bob", &[1; 16]));
        assert_eq!(SecretId::from_hex(&a.to_hex()), Some(a));
        assert_eq!(SecretId::from_hex("zz"), None);
    }

    #[test]
    fn test_map_consistency() {
        let location = |index: u8| FragmentLocation {
            index,
            node_id: NodeId::from("n"),
            storage_key: StorageKey::derive(&ContentHash::from_bytes([index; 32]), index),
            content_hash: ContentHash::from_bytes([index; 32]),
        };
        let mut map = FragmentMap {
            secret_id: secret_id(),
            threshold: 2,
            share_count: 3,
            created_at: 0,
            degraded: false,
            locations: vec![location(1), location(3)],
        };
        assert!(map.is_consistent());
        map.locations[1] = location(1);
        assert!(!map.is_consistent());
        map.locations[1] = location(4);
        assert!(!map.is_consistent());
        map.locations.pop();
        assert!(!map.is_consistent());
    }
}
