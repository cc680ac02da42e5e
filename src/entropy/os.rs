//! Operating-system entropy.
//!
//! Thin wrapper over `rand_core::OsRng` (getrandom). Stateless, so a fresh value
//! can be created wherever one is needed.

use rand_core::{OsRng, RngCore};
use super::{EntropyError, EntropySource};

/// Entropy drawn from the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|_| EntropyError::CollectionFailed)
    }
}
