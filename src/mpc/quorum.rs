//! Quorum logic for Shamir's Secret Sharing over GF(2^61 - 1).
//!
//! This module implements the threshold logic and polynomial generation required
//! to split secrets into shares.
//!
//! # Security
//! - **Zeroization**: Polynomial coefficients are zeroized after each byte.
//! - **Validation**: Checks threshold parameters ($1 \le k \le n \le 255$).

use zeroize::Zeroizing;
use crate::core::field::Fp;
use crate::entropy::EntropySource;
use super::polynomial::Polynomial;
use super::{MpcError, share::Share};

/// Largest share count: indices are non-zero bytes.
pub const MAX_SHARES: usize = u8::MAX as usize;

/// Validates a (threshold, shares) pair.
pub fn check_parameters(k: usize, n: usize) -> Result<(), MpcError> {
    if k < 1 || k > n {
        return Err(MpcError::InvalidThreshold);
    }
    if n > MAX_SHARES {
        return Err(MpcError::InvalidShareCount);
    }
    Ok(())
}

/// Splits a secret into `n` shares, requiring `k` shares to reconstruct.
///
/// # Arguments
/// * `secret` - The secret data to split.
/// * `k` - The threshold number of shares required for reconstruction.
/// * `n` - The total number of shares to generate.
/// * `rng` - A mutable reference to an entropy source.
///
/// # Returns
/// * `Ok(Vec<Share>)` containing `n` shares with indices `1..=n`.
/// * `Err(MpcError)` on failure (invalid params, rng failure).
pub fn split_secret<R: EntropySource + ?Sized>(
    secret: &[u8],
    k: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Share>, MpcError> {
    if secret.is_empty() {
        return Err(MpcError::EmptySecret);
    }
    check_parameters(k, n)?;

    // share_values[i] belongs to the share with index i + 1.
    let mut share_values: Vec<Zeroizing<Vec<Fp>>> = (0..n)
        .map(|_| Zeroizing::new(Vec::with_capacity(secret.len())))
        .collect();

    let xs: Vec<Fp> = (1..=n).map(|i| Fp::from(i as u8)).collect();

    for &byte in secret {
        let poly = Polynomial::random(Fp::from(byte), k - 1, rng)?;
        for (values, &x) in share_values.iter_mut().zip(xs.iter()) {
            values.push(poly.evaluate(x));
        }
    }

    share_values
        .into_iter()
        .enumerate()
        .map(|(i, mut values)| Share::new((i + 1) as u8, std::mem::take(&mut *values)))
        .collect()
}
