//! Access credentials.
//!
//! A credential is an opaque token. Deciding whether it is valid belongs to an
//! [`Authorizer`] supplied by the host application; the controller and every
//! node each consult their own authorizer before releasing anything.

use std::collections::HashSet;
use std::fmt;
use std::sync::RwLock;
use zeroize::Zeroizing;

/// Opaque caller credential. Wiped on drop; never printed.
#[derive(Clone)]
pub struct AccessCredential(Zeroizing<Vec<u8>>);

impl AccessCredential {
    pub fn new(token: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(***)")
    }
}

/// Credential validation collaborator.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, credential: &AccessCredential) -> bool;
}

/// Accepts tokens from an allow-list.
///
/// Only BLAKE3 digests of granted tokens are kept.
#[derive(Default)]
pub struct TokenAuthorizer {
    digests: RwLock<HashSet<[u8; 32]>>,
}

impl TokenAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an authorizer that accepts exactly the given tokens.
    pub fn with_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let authorizer = Self::new();
        for token in tokens {
            authorizer.grant(token.as_ref());
        }
        authorizer
    }

    pub fn grant(&self, token: &[u8]) {
        if let Ok(mut digests) = self.digests.write() {
            digests.insert(digest(token));
        }
    }

    pub fn revoke(&self, token: &[u8]) {
        if let Ok(mut digests) = self.digests.write() {
            digests.remove(&digest(token));
        }
    }
}

impl Authorizer for TokenAuthorizer {
    fn authorize(&self, credential: &AccessCredential) -> bool {
        // A poisoned lock denies.
        self.digests
            .read()
            .map(|digests| digests.contains(&digest(credential.as_bytes())))
            .unwrap_or(false)
    }
}

fn digest(token: &[u8]) -> [u8; 32] {
    blake3::derive_key("fragvault 2026-01 access token digest", token)
}
