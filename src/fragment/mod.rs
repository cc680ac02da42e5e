//! Fragments: sealed, committed shares.
//!
//! A [`Fragment`] is what leaves the sharing engine and lands on a storage node.
//! It carries only public metadata in the clear (index, content hash, creation
//! time); the share values travel inside `payload`, encrypted under a
//! per-fragment key held by a [`KeyManager`](crate::keys::KeyManager).
//!
//! # Components
//! - `codec`: binary layouts for share plaintexts and fragment envelopes.
//! - `seal`: commitment, encryption and the matching verification on open.
//!
//! # Security
//! - The content hash is a BLAKE3 commitment over the serialized share plus a
//!   random blinding value. It gives tamper evidence; it is not a
//!   zero-knowledge proof of anything.

pub mod codec;
pub mod seal;

use std::fmt;
use serde::{Deserialize, Serialize};

/// BLAKE3 commitment to a fragment's plaintext. Also names the fragment key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(#[serde(with = "hex32")] [u8; 32]);

impl ContentHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

/// One sealed share of a secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Share index (x-coordinate), 1..=N.
    pub index: u8,
    /// Commitment to the sealed plaintext.
    pub content_hash: ContentHash,
    /// Unix seconds at split time.
    pub created_at: u64,
    /// `nonce || ciphertext` of the serialized share.
    pub payload: Vec<u8>,
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("index", &self.index)
            .field("content_hash", &self.content_hash)
            .field("created_at", &self.created_at)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Current Unix time in seconds; zero if the clock is before the epoch.
pub(crate) fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Serde adapter: 32-byte arrays as lowercase hex strings.
pub(crate) mod hex32 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        let raw = hex::decode(text).map_err(D::Error::custom)?;
        raw.try_into()
            .map_err(|_| D::Error::custom("expected 32 bytes"))
    }
}
