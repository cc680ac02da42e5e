//! Secret reconstruction from shares.
//!
//! This module implements Lagrange interpolation over GF(2^61 - 1) to reconstruct
//! the original secret from a threshold number of shares.
//!
//! # Security
//! - **Validation**: Checks for duplicate indices and length mismatches before
//!   any division happens.
//! - **Range Check**: Every recovered value must be a byte; anything larger means
//!   the shares were not produced together and is reported as an integrity failure.

use zeroize::Zeroizing;
use crate::core::field::Fp;
use super::polynomial::lagrange_at_zero;
use super::{MpcError, share::Share};

/// Reconstructs the secret from a list of shares.
///
/// Uses every share given; selecting exactly `k` of them is the caller's job.
///
/// # Returns
/// * `Ok(Zeroizing<Vec<u8>>)` - The reconstructed secret.
/// * `Err(MpcError)` - If inputs are invalid (mismatched lengths, duplicates, etc.).
pub fn reconstruct_secret(shares: &[Share]) -> Result<Zeroizing<Vec<u8>>, MpcError> {
    let first = shares.first().ok_or(MpcError::InsufficientShares)?;
    let share_len = first.len();

    if shares.iter().any(|s| s.len() != share_len) {
        return Err(MpcError::ShareLengthMismatch);
    }
    check_distinct(shares)?;

    let xs: Vec<Fp> = shares.iter().map(Share::x).collect();
    let lambdas = lagrange_at_zero(&xs);

    // S[p] = sum_j share_j[p] * lambda_j
    let mut secret = Zeroizing::new(Vec::with_capacity(share_len));
    for p in 0..share_len {
        let mut sum = Fp::ZERO;
        for (share, lambda) in shares.iter().zip(lambdas.iter()) {
            sum += share.values[p] * *lambda;
        }
        let byte = u8::try_from(sum.value()).map_err(|_| MpcError::IntegrityFailure)?;
        secret.push(byte);
    }

    Ok(secret)
}

/// Rejects share sets with repeated indices.
///
/// O(N^2) is fine since N <= 255.
pub(crate) fn check_distinct(shares: &[Share]) -> Result<(), MpcError> {
    for i in 0..shares.len() {
        for j in (i + 1)..shares.len() {
            if shares[i].index == shares[j].index {
                return Err(MpcError::DuplicateShareIndex);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::testing::MockEntropy;
    use crate::entropy::OsEntropy;
    use crate::mpc::quorum::split_secret;
    use proptest::prelude::*;

    /// All k-subsets of 0..n, as index lists.
    fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
        fn walk(start: usize, n: usize, k: usize, cur: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            if cur.len() == k {
                out.push(cur.clone());
                return;
            }
            for i in start..n {
                cur.push(i);
                walk(i + 1, n, k, cur, out);
                cur.pop();
            }
        }
        let mut out = Vec::new();
        walk(0, n, k, &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn test_reconstruct_every_threshold_subset() {
        let mut rng = MockEntropy::new(0x10);
        let secret = b"hello-vault".to_vec();
        let shares = split_secret(&secret, 3, 5, &mut rng).unwrap();

        let all = subsets(5, 3);
        assert_eq!(all.len(), 10);
        for subset in all {
            let picked: Vec<Share> = subset.iter().map(|&i| shares[i].clone()).collect();
            let recovered = reconstruct_secret(&picked).expect("subset reconstruction failed");
            assert_eq!(recovered.as_slice(), secret.as_slice(), "subset {subset:?}");
        }
    }

    #[test]
    fn test_below_threshold_does_not_recover() {
        let mut rng = OsEntropy;
        let secret = b"hello-vault".to_vec();
        let shares = split_secret(&secret, 3, 5, &mut rng).unwrap();

        // Interpolating a degree-2 polynomial through two points yields an unrelated
        // constant term: either a non-byte (rejected) or the wrong bytes.
        let result = reconstruct_secret(&shares[0..2]);
        match result {
            Ok(bytes) => assert_ne!(bytes.as_slice(), secret.as_slice()),
            Err(e) => assert_eq!(e, MpcError::IntegrityFailure),
        }
    }

    #[test]
    fn test_reconstruct_errors() {
        let share1 = Share::new(1, vec![Fp::ONE, Fp::from(2u8)]).unwrap();
        let share2 = Share::new(2, vec![Fp::from(3u8)]).unwrap();
        let share3 = Share::new(1, vec![Fp::ONE, Fp::from(2u8)]).unwrap();

        assert_eq!(
            reconstruct_secret(&[share1.clone(), share2]).err(),
            Some(MpcError::ShareLengthMismatch)
        );
        assert_eq!(
            reconstruct_secret(&[share1, share3]).err(),
            Some(MpcError::DuplicateShareIndex)
        );
        assert_eq!(reconstruct_secret(&[]).err(), Some(MpcError::InsufficientShares));
    }

    #[test]
    fn test_non_byte_result_is_integrity_failure() {
        // A single share with k = 1 is the secret itself; a value above 255 is forged.
        let forged = Share::new(1, vec![Fp::new(1_000)]).unwrap();
        assert_eq!(reconstruct_secret(&[forged]).err(), Some(MpcError::IntegrityFailure));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            n in 1usize..8,
            k_seed in 0usize..8,
            rotate in 0usize..8,
        ) {
            let k = 1 + k_seed % n;
            let mut rng = OsEntropy;
            let mut shares = split_secret(&secret, k, n, &mut rng).unwrap();
            shares.rotate_left(rotate % n);
            let recovered = reconstruct_secret(&shares[..k]).unwrap();
            prop_assert_eq!(recovered.as_slice(), secret.as_slice());
        }
    }
}
