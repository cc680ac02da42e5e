//! Secret Share Definition.
//!
//! A share is a set of points $(x, y_p)$, one per secret byte position $p$, on the
//! polynomials used to hide the secret.
//! - $x$ (index): A non-zero byte unique to each fragment.
//! - $y_p$ (values): The evaluation of the $p$-th polynomial at $x$.
//!
//! # Security
//! - Implements `Zeroize` and `ZeroizeOnDrop` to wipe sensitive data from memory.
//! - `Debug` implementation redacts the actual values.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};
use crate::core::field::Fp;
use super::MpcError;

/// A share of a secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    /// The x-coordinate (1..=255). Public: it names the fragment.
    #[zeroize(skip)]
    pub index: u8,

    /// The y-coordinates (one per byte of the secret).
    pub values: Vec<Fp>,
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("index", &self.index)
            .field("length", &self.values.len())
            .field("values", &"***SENSITIVE***")
            .finish()
    }
}

impl Share {
    /// Creates a new share with validation.
    ///
    /// # Returns
    /// * `Err(MpcError::InvalidShareIndex)` for index 0 (it would reveal the secret).
    /// * `Err(MpcError::EmptySecret)` for an empty value vector.
    pub fn new(index: u8, values: Vec<Fp>) -> Result<Self, MpcError> {
        if index == 0 {
            return Err(MpcError::InvalidShareIndex);
        }
        if values.is_empty() {
            return Err(MpcError::EmptySecret);
        }
        Ok(Self { index, values })
    }

    /// Number of secret bytes covered by this share.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The x-coordinate as a field element.
    pub(crate) fn x(&self) -> Fp {
        Fp::from(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_creation() {
        let s = Share::new(1, vec![Fp::from(10u8), Fp::from(20u8)]).unwrap();
        assert_eq!(s.index, 1);
        assert_eq!(s.len(), 2);
        assert_eq!(s.x(), Fp::ONE);
    }

    #[test]
    fn test_share_validation() {
        assert_eq!(Share::new(0, vec![Fp::ONE]), Err(MpcError::InvalidShareIndex));
        assert_eq!(Share::new(1, vec![]), Err(MpcError::EmptySecret));
    }

    #[test]
    fn test_debug_redaction() {
        let s = Share::new(5, vec![Fp::new(987_654_321); 4]).unwrap();
        let debug_str = format!("{:?}", s);
        assert!(debug_str.contains("index: 5"));
        assert!(debug_str.contains("length: 4"));
        assert!(debug_str.contains("***SENSITIVE***"));
        assert!(!debug_str.contains("987654321"));
    }
}
