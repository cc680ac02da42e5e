//! Binary layouts.
//!
//! Share plaintext (what gets committed to and encrypted):
//! `[version (1)] [blinding (16)] [index (1)] [count (4, LE)] [values (8 * count, LE)]`
//!
//! Fragment envelope (what a directory-backed node writes to disk):
//! `[version (1)] [index (1)] [content hash (32)] [created_at (8, LE)] [payload len (4, LE)] [payload]`

use std::fmt;
use zeroize::Zeroizing;
use crate::core::field::{Fp, ELEMENT_BYTES};
use crate::mpc::share::Share;
use super::{ContentHash, Fragment};

const SHARE_VERSION: u8 = 1;
const ENVELOPE_VERSION: u8 = 1;

/// Length of the commitment blinding value.
pub const BLINDING_LEN: usize = 16;

const SHARE_HEADER_LEN: usize = 1 + BLINDING_LEN + 1 + 4;
const ENVELOPE_HEADER_LEN: usize = 1 + 1 + 32 + 8 + 4;

/// Decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the declared length.
    Truncated,
    /// Bytes left over after the declared length.
    TrailingBytes,
    /// Unknown layout version.
    UnknownVersion,
    /// A field value outside `[0, p)`, or a zero share index.
    InvalidValue,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "Truncated input"),
            CodecError::TrailingBytes => write!(f, "Trailing bytes after record"),
            CodecError::UnknownVersion => write!(f, "Unknown record version"),
            CodecError::InvalidValue => write!(f, "Invalid value in record"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Serializes a share together with its blinding value.
pub fn encode_share(share: &Share, blinding: &[u8; BLINDING_LEN]) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(
        SHARE_HEADER_LEN + share.len() * ELEMENT_BYTES,
    ));
    out.push(SHARE_VERSION);
    out.extend_from_slice(blinding);
    out.push(share.index);
    out.extend_from_slice(&(share.len() as u32).to_le_bytes());
    for value in &share.values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Parses a share plaintext, discarding the blinding value.
pub fn decode_share(bytes: &[u8]) -> Result<Share, CodecError> {
    if bytes.len() < SHARE_HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if bytes[0] != SHARE_VERSION {
        return Err(CodecError::UnknownVersion);
    }
    let index = bytes[1 + BLINDING_LEN];
    let count = read_u32(&bytes[2 + BLINDING_LEN..SHARE_HEADER_LEN]) as usize;

    let body = &bytes[SHARE_HEADER_LEN..];
    let expected = count
        .checked_mul(ELEMENT_BYTES)
        .ok_or(CodecError::InvalidValue)?;
    if body.len() < expected {
        return Err(CodecError::Truncated);
    }
    if body.len() > expected {
        return Err(CodecError::TrailingBytes);
    }

    let values = body
        .chunks_exact(ELEMENT_BYTES)
        .map(|chunk| Fp::from_canonical(read_u64(chunk)).ok_or(CodecError::InvalidValue))
        .collect::<Result<Vec<Fp>, CodecError>>()?;

    Share::new(index, values).map_err(|_| CodecError::InvalidValue)
}

/// Serializes a fragment for storage.
pub fn encode_fragment(fragment: &Fragment) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_HEADER_LEN + fragment.payload.len());
    out.push(ENVELOPE_VERSION);
    out.push(fragment.index);
    out.extend_from_slice(fragment.content_hash.as_bytes());
    out.extend_from_slice(&fragment.created_at.to_le_bytes());
    out.extend_from_slice(&(fragment.payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&fragment.payload);
    out
}

/// Parses a stored fragment envelope.
pub fn decode_fragment(bytes: &[u8]) -> Result<Fragment, CodecError> {
    if bytes.len() < ENVELOPE_HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if bytes[0] != ENVELOPE_VERSION {
        return Err(CodecError::UnknownVersion);
    }
    let index = bytes[1];
    if index == 0 {
        return Err(CodecError::InvalidValue);
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[2..34]);
    let created_at = read_u64(&bytes[34..42]);
    let payload_len = read_u32(&bytes[42..46]) as usize;

    let payload = &bytes[ENVELOPE_HEADER_LEN..];
    if payload.len() < payload_len {
        return Err(CodecError::Truncated);
    }
    if payload.len() > payload_len {
        return Err(CodecError::TrailingBytes);
    }

    Ok(Fragment {
        index,
        content_hash: ContentHash::from_bytes(hash),
        created_at,
        payload: payload.to_vec(),
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
