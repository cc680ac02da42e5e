//! External entry point.
//!
//! The [`Controller`] owns the catalog of fragment maps, checks callers'
//! credentials before anything reaches the nodes, and records every action in
//! an [`AuditLog`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use zeroize::Zeroizing;
use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::auth::{AccessCredential, Authorizer};
use crate::entropy::{EntropySource, OsEntropy};
use crate::mpc::MpcError;
use crate::network::{
    FragmentMap, NetworkStatus, NodeNetwork, ProtectWarning, SecretId, VaultError,
};

const CATALOG_VERSION: u32 = 1;

/// Result of a successful protect.
#[derive(Debug, Clone)]
pub struct ProtectReceipt {
    pub secret_id: SecretId,
    pub fragment_map: FragmentMap,
    pub warnings: Vec<ProtectWarning>,
}

#[derive(Serialize, Deserialize)]
struct Catalog {
    version: u32,
    maps: Vec<FragmentMap>,
}

pub struct Controller {
    network: NodeNetwork,
    authorizer: Arc<dyn Authorizer>,
    catalog: RwLock<BTreeMap<SecretId, FragmentMap>>,
    audit: Mutex<AuditLog>,
}

impl Controller {
    pub fn new(network: NodeNetwork, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            network,
            authorizer,
            catalog: RwLock::new(BTreeMap::new()),
            audit: Mutex::new(AuditLog::default()),
        }
    }

    pub fn network(&self) -> &NodeNetwork {
        &self.network
    }

    /// Protects `data` on behalf of `owner_id`.
    pub async fn protect(&self, owner_id: &str, data: &[u8]) -> Result<ProtectReceipt, VaultError> {
        let result = self.protect_inner(owner_id, data).await;
        let secret_id = result.as_ref().ok().map(|r| r.secret_id);
        self.record(AuditAction::Protect, secret_id, result.as_ref().err().copied());
        result
    }

    async fn protect_inner(&self, owner_id: &str, data: &[u8]) -> Result<ProtectReceipt, VaultError> {
        if owner_id.is_empty() || data.is_empty() {
            return Err(VaultError::InvalidParameters);
        }
        let mut salt = [0u8; 16];
        OsEntropy
            .fill(&mut salt)
            .map_err(|_| VaultError::Engine(MpcError::RngFailure))?;
        let secret_id = SecretId::derive(owner_id, &salt);

        let outcome = self.network.protect(secret_id, data).await?;
        self.catalog
            .write()
            .await
            .insert(secret_id, outcome.map.clone());
        Ok(ProtectReceipt {
            secret_id,
            fragment_map: outcome.map,
            warnings: outcome.warnings,
        })
    }

    /// Returns the secret to an authorized caller.
    pub async fn retrieve(
        &self,
        secret_id: &SecretId,
        credential: &AccessCredential,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let result = async {
            let map = self.authorized_map(secret_id, credential).await?;
            self.network.retrieve(&map, credential).await
        }
        .await;
        self.record(AuditAction::Retrieve, Some(*secret_id), result.as_ref().err().copied());
        result
    }

    /// Removes a secret's fragments, keys and catalog entry.
    pub async fn delete(
        &self,
        secret_id: &SecretId,
        credential: &AccessCredential,
    ) -> Result<(), VaultError> {
        let result = async {
            let map = self.authorized_map(secret_id, credential).await?;
            self.network.discard(&map, credential).await?;
            self.catalog.write().await.remove(secret_id);
            Ok::<(), VaultError>(())
        }
        .await;
        self.record(AuditAction::Delete, Some(*secret_id), result.err());
        result
    }

    pub async fn network_status(&self) -> NetworkStatus {
        self.network.status().await
    }

    /// Serializes every fragment map as JSON.
    pub async fn export_catalog(&self) -> Result<String, VaultError> {
        let catalog = Catalog {
            version: CATALOG_VERSION,
            maps: self.catalog.read().await.values().cloned().collect(),
        };
        serde_json::to_string_pretty(&catalog).map_err(|_| VaultError::CatalogFormat)
    }

    /// Loads fragment maps from JSON written by [`export_catalog`](Self::export_catalog).
    ///
    /// Nothing is imported unless every map is well formed. Existing entries
    /// with the same secret id are replaced. Returns the number of maps read.
    pub async fn import_catalog(&self, json: &str) -> Result<usize, VaultError> {
        let result = self.import_inner(json).await;
        self.record(AuditAction::ImportCatalog, None, result.as_ref().err().copied());
        result
    }

    async fn import_inner(&self, json: &str) -> Result<usize, VaultError> {
        let parsed: Catalog = serde_json::from_str(json).map_err(|e| {
            log::warn!("Rejected catalog: {}", e);
            VaultError::CatalogFormat
        })?;
        if parsed.version != CATALOG_VERSION {
            log::warn!("Rejected catalog version {}", parsed.version);
            return Err(VaultError::CatalogFormat);
        }
        if let Some(bad) = parsed.maps.iter().find(|m| !m.is_consistent()) {
            log::warn!("Rejected catalog: inconsistent map for {}", bad.secret_id);
            return Err(VaultError::CatalogFormat);
        }

        let count = parsed.maps.len();
        let mut catalog = self.catalog.write().await;
        for map in parsed.maps {
            catalog.insert(map.secret_id, map);
        }
        log::info!("Imported {} fragment maps", count);
        Ok(count)
    }

    /// A copy of the recorded audit trail, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().map(|audit| audit.entries()).unwrap_or_default()
    }

    async fn authorized_map(
        &self,
        secret_id: &SecretId,
        credential: &AccessCredential,
    ) -> Result<FragmentMap, VaultError> {
        if !self.authorizer.authorize(credential) {
            log::warn!("Rejected credential for {}", secret_id);
            return Err(VaultError::AccessDenied);
        }
        self.catalog
            .read()
            .await
            .get(secret_id)
            .cloned()
            .ok_or(VaultError::UnknownSecret)
    }

    fn record(&self, action: AuditAction, secret_id: Option<SecretId>, error: Option<VaultError>) {
        match self.audit.lock() {
            Ok(mut audit) => audit.log(action, secret_id, error),
            Err(_) => log::error!("Audit log unavailable; dropped {} entry", action),
        }
    }
}
