//! Polynomial operations for secret sharing.
//!
//! Shared by `quorum` (share generation) and `reconstruct` (interpolation).

use zeroize::Zeroizing;
use crate::core::field::{poly_eval, Fp, MODULUS};
use crate::entropy::EntropySource;
use super::MpcError;

/// A hiding polynomial f(x) = c0 + c1*x + ... + c(k-1)*x^(k-1).
///
/// Coefficients live in a `Zeroizing` buffer and are wiped when the polynomial
/// goes out of scope.
pub(crate) struct Polynomial {
    coeffs: Zeroizing<Vec<Fp>>,
}

impl Polynomial {
    /// Builds a polynomial of the given degree with `constant` as c0 and the
    /// remaining coefficients uniform over the field.
    pub(crate) fn random<R: EntropySource + ?Sized>(
        constant: Fp,
        degree: usize,
        rng: &mut R,
    ) -> Result<Self, MpcError> {
        let mut coeffs = Zeroizing::new(Vec::with_capacity(degree + 1));
        coeffs.push(constant);
        for _ in 0..degree {
            coeffs.push(random_element(rng)?);
        }
        Ok(Self { coeffs })
    }

    #[inline(always)]
    pub(crate) fn evaluate(&self, x: Fp) -> Fp {
        poly_eval(&self.coeffs, x)
    }

    #[cfg(test)]
    pub(crate) fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }
}

/// Draws a uniform field element by rejection sampling 61-bit values.
///
/// The only rejected value is `MODULUS` itself, so a retry is needed with
/// probability 2^-61.
pub(crate) fn random_element<R: EntropySource + ?Sized>(rng: &mut R) -> Result<Fp, MpcError> {
    loop {
        let candidate = rng.next_u64().map_err(|_| MpcError::RngFailure)? & MODULUS;
        if let Some(element) = Fp::from_canonical(candidate) {
            return Ok(element);
        }
    }
}

/// Lagrange basis values at x = 0 for the given distinct abscissas.
///
/// lambda_j = prod_{m != j} x_m / (x_m - x_j)
///
/// # Panics
/// If two abscissas coincide. Callers reject duplicate share indices before
/// interpolating, so a zero denominator here is a broken invariant.
pub(crate) fn lagrange_at_zero(xs: &[Fp]) -> Vec<Fp> {
    xs.iter()
        .enumerate()
        .map(|(j, &xj)| {
            let mut numerator = Fp::ONE;
            let mut denominator = Fp::ONE;
            for (m, &xm) in xs.iter().enumerate() {
                if m == j {
                    continue;
                }
                numerator *= xm;
                denominator *= xm - xj;
            }
            let inv = denominator
                .inv()
                .expect("share indices passed to interpolation must be distinct");
            numerator * inv
        })
        .collect()
}
