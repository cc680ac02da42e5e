//! Fragment key management.
//!
//! Every fragment is sealed under its own random 256-bit key. Keys never travel
//! with the fragment: they are handed to a [`KeyManager`] at split time and
//! looked up by the fragment's content hash when the fragment is opened.
//!
//! [`InMemoryKeyManager`] keeps keys in process memory, zeroized on drop. A
//! deployment backed by an HSM or KMS implements the same trait.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use zeroize::Zeroizing;
use crate::fragment::ContentHash;

/// Length of a fragment key in bytes.
pub const KEY_LEN: usize = 32;

/// Errors from a key manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// No key is registered under the identifier.
    NotFound,
    /// A different key is already registered under the identifier.
    Collision,
    /// The key store could not be accessed.
    Unavailable,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::NotFound => write!(f, "Fragment key not found"),
            KeyError::Collision => write!(f, "Fragment key identifier already in use"),
            KeyError::Unavailable => write!(f, "Key store unavailable"),
        }
    }
}

impl std::error::Error for KeyError {}

/// A symmetric fragment key. Wiped on drop.
#[derive(Clone)]
pub struct FragmentKey(Zeroizing<[u8; KEY_LEN]>);

impl FragmentKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub(crate) fn zeroed() -> Self {
        Self(Zeroizing::new([0u8; KEY_LEN]))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.0
    }
}

impl fmt::Debug for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FragmentKey(***SENSITIVE***)")
    }
}

impl PartialEq for FragmentKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.as_bytes(), other.as_bytes())
    }
}

/// Custody of fragment keys.
pub trait KeyManager: Send + Sync {
    /// Registers `key` under `id`. Registering the same key twice is a no-op.
    fn store_key(&self, id: &ContentHash, key: FragmentKey) -> Result<(), KeyError>;

    /// Returns a copy of the key registered under `id`.
    fn fetch_key(&self, id: &ContentHash) -> Result<FragmentKey, KeyError>;

    /// Destroys the key registered under `id`. Missing keys are not an error.
    fn destroy_key(&self, id: &ContentHash) -> Result<(), KeyError>;
}

/// Process-local key custody.
#[derive(Default)]
pub struct InMemoryKeyManager {
    keys: RwLock<HashMap<ContentHash, FragmentKey>>,
}

impl InMemoryKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.keys.read().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyManager for InMemoryKeyManager {
    fn store_key(&self, id: &ContentHash, key: FragmentKey) -> Result<(), KeyError> {
        let mut keys = self.keys.write().map_err(|_| KeyError::Unavailable)?;
        match keys.get(id) {
            Some(existing) if *existing == key => Ok(()),
            Some(_) => Err(KeyError::Collision),
            None => {
                keys.insert(*id, key);
                Ok(())
            }
        }
    }

    fn fetch_key(&self, id: &ContentHash) -> Result<FragmentKey, KeyError> {
        let keys = self.keys.read().map_err(|_| KeyError::Unavailable)?;
        keys.get(id).cloned().ok_or(KeyError::NotFound)
    }

    fn destroy_key(&self, id: &ContentHash) -> Result<(), KeyError> {
        let mut keys = self.keys.write().map_err(|_| KeyError::Unavailable)?;
        keys.remove(id);
        Ok(())
    }
}

#[inline(never)]
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
