//! Fragment sealing.
//!
//! # Scheme
//! 1. **Plaintext**: `codec::encode_share(share, blinding)` with a fresh random blinding.
//! 2. **Commitment**: `ContentHash = BLAKE3_DERIVE_KEY(COMMIT_CONTEXT, plaintext)`.
//! 3. **Key**: a fresh random 256-bit key, registered with the key manager under
//!    the content hash.
//! 4. **Encryption**: ChaCha20-Poly1305 with a random 96-bit nonce and
//!    `index || content hash` as associated data.
//! 5. **Payload**: `[Nonce (12)] [Ciphertext + Tag (...)]`
//!
//! Opening reverses the steps and rejects the fragment unless the AEAD tag
//! verifies, the recomputed commitment matches and the embedded index matches
//! the envelope index.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::Zeroizing;
use crate::entropy::EntropySource;
use crate::keys::{FragmentKey, KeyManager};
use crate::mpc::{share::Share, MpcError};
use super::codec::{self, BLINDING_LEN};
use super::{ContentHash, Fragment};

const COMMIT_CONTEXT: &str = "fragvault 2026-01 fragment content commitment";
const NONCE_LEN: usize = 12;

/// Computes the commitment for a share plaintext.
pub fn commit(plaintext: &[u8]) -> ContentHash {
    let mut hasher = blake3::Hasher::new_derive_key(COMMIT_CONTEXT);
    hasher.update(plaintext);
    ContentHash::from_bytes(hasher.finalize().into())
}

/// Seals a share into a fragment and registers its key.
pub fn seal<R: EntropySource + ?Sized>(
    share: &Share,
    keys: &dyn KeyManager,
    rng: &mut R,
    created_at: u64,
) -> Result<Fragment, MpcError> {
    let mut blinding = Zeroizing::new([0u8; BLINDING_LEN]);
    rng.fill(&mut *blinding).map_err(|_| MpcError::RngFailure)?;
    let plaintext = codec::encode_share(share, &blinding);
    let content_hash = commit(&plaintext);

    let mut key = FragmentKey::zeroed();
    rng.fill(key.as_mut_bytes()).map_err(|_| MpcError::RngFailure)?;
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce).map_err(|_| MpcError::RngFailure)?;

    let payload = encrypt(&key, &nonce, share.index, &content_hash, &plaintext)?;
    keys.store_key(&content_hash, key)?;

    Ok(Fragment {
        index: share.index,
        content_hash,
        created_at,
        payload,
    })
}

/// Decrypts and verifies a fragment.
///
/// # Returns
/// * `Err(MpcError::KeyUnavailable)` if the key manager has no key for it.
/// * `Err(MpcError::IntegrityFailure)` on any authentication, commitment or
///   decoding mismatch.
pub fn open(fragment: &Fragment, keys: &dyn KeyManager) -> Result<Share, MpcError> {
    let key = keys.fetch_key(&fragment.content_hash)?;
    let plaintext = decrypt(&key, fragment)?;

    // blake3::Hash equality is constant-time.
    let expected = blake3::Hash::from(*fragment.content_hash.as_bytes());
    let actual = blake3::Hash::from(*commit(&plaintext).as_bytes());
    if expected != actual {
        return Err(MpcError::IntegrityFailure);
    }

    let share = codec::decode_share(&plaintext).map_err(|_| MpcError::IntegrityFailure)?;
    if share.index != fragment.index {
        return Err(MpcError::IntegrityFailure);
    }
    Ok(share)
}

fn associated_data(index: u8, content_hash: &ContentHash) -> [u8; 33] {
    let mut aad = [0u8; 33];
    aad[0] = index;
    aad[1..].copy_from_slice(content_hash.as_bytes());
    aad
}

fn encrypt(
    key: &FragmentKey,
    nonce: &[u8; NONCE_LEN],
    index: u8,
    content_hash: &ContentHash,
    plaintext: &[u8],
) -> Result<Vec<u8>, MpcError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let aad = associated_data(index, content_hash);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad: &aad })
        .map_err(|_| MpcError::CryptoFailure)?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(nonce);
    payload.extend_from_slice(&ciphertext);
    Ok(payload)
}

fn decrypt(key: &FragmentKey, fragment: &Fragment) -> Result<Zeroizing<Vec<u8>>, MpcError> {
    if fragment.payload.len() < NONCE_LEN {
        return Err(MpcError::IntegrityFailure);
    }
    let (nonce, ciphertext) = fragment.payload.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let aad = associated_data(fragment.index, &fragment.content_hash);
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad: &aad })
        .map(Zeroizing::new)
        .map_err(|_| MpcError::IntegrityFailure)
}
