//! Prime field arithmetic module.
//!
//! This module implements arithmetic over GF(p) with the Mersenne prime
//! p = 2^61 - 1. Every secret byte (0..=255) is strictly less than p, so a byte
//! embeds into the field without loss, and products of two reduced elements fit
//! in a `u128` before reduction.
//!
//! # Design Choices
//! - **Mersenne Reduction**: Reduction mod 2^61 - 1 is a shift, a mask and an add,
//!   with no division and no data-dependent table lookups.
//! - **Inverse by Fermat**: a^{-1} = a^{p-2}, computed with a fixed-length
//!   square-and-multiply ladder over the bits of p - 2.
//! - **Zero Has No Inverse**: `inv` returns `None` for zero; callers that divide
//!   by differences of share indices must reject duplicate indices first.
//!
//! # Usage
//! ```
//! use fragvault::core::field::Fp;
//! let a = Fp::from(7u8);
//! let b = Fp::from(3u8);
//! let prod = a * b;
//! assert_eq!(prod * b.inv().unwrap(), a);
//! ```

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use zeroize::Zeroize;

/// The field modulus, 2^61 - 1.
pub const MODULUS: u64 = (1u64 << 61) - 1;

/// Width in bytes of a serialized field element.
pub const ELEMENT_BYTES: usize = 8;

/// A reduced field element in `[0, MODULUS)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Zeroize)]
#[repr(transparent)]
pub struct Fp(u64);

impl Fp {
    pub const ZERO: Fp = Fp(0);
    pub const ONE: Fp = Fp(1);

    /// Builds an element from a `u64`, reducing it modulo p.
    #[inline(always)]
    pub fn new(value: u64) -> Self {
        Fp(reduce64(value))
    }

    /// Builds an element only if `value` is already canonical.
    ///
    /// Used when decoding stored fragments, where a non-canonical value means
    /// the bytes were not produced by this field.
    pub fn from_canonical(value: u64) -> Option<Self> {
        if value < MODULUS {
            Some(Fp(value))
        } else {
            None
        }
    }

    /// Returns the canonical representative.
    #[inline(always)]
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Raises `self` to `exp` with square-and-multiply.
    pub fn pow(self, mut exp: u64) -> Self {
        let mut result = Fp::ONE;
        let mut base = self;
        while exp > 0 {
            if exp & 1 == 1 {
                result *= base;
            }
            base *= base;
            exp >>= 1;
        }
        result
    }

    /// Multiplicative inverse, `None` for zero.
    pub fn inv(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self.pow(MODULUS - 2))
        }
    }

    /// Computes `self / rhs`, returning `None` on division by zero.
    pub fn div(self, rhs: Self) -> Option<Self> {
        rhs.inv().map(|inv| self * inv)
    }

    pub fn to_le_bytes(self) -> [u8; ELEMENT_BYTES] {
        self.0.to_le_bytes()
    }
}

/// Reduces any `u64` into `[0, p)`.
#[inline(always)]
fn reduce64(x: u64) -> u64 {
    let r = (x & MODULUS) + (x >> 61);
    if r >= MODULUS {
        r - MODULUS
    } else {
        r
    }
}

/// Reduces a product of two canonical elements.
///
/// x < p^2 < 2^122, so `hi` and `lo` are both below 2^61 and their sum fits a u64.
#[inline(always)]
fn reduce128(x: u128) -> u64 {
    let lo = (x as u64) & MODULUS;
    let hi = (x >> 61) as u64;
    reduce64(lo + hi)
}

impl From<u8> for Fp {
    #[inline(always)]
    fn from(value: u8) -> Self {
        Fp(value as u64)
    }
}

impl Add for Fp {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        // Both operands are below 2^61, so the sum cannot overflow.
        let sum = self.0 + rhs.0;
        Fp(if sum >= MODULUS { sum - MODULUS } else { sum })
    }
}

impl AddAssign for Fp {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fp {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl SubAssign for Fp {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fp {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        if self.0 == 0 {
            self
        } else {
            Fp(MODULUS - self.0)
        }
    }
}

impl Mul for Fp {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Fp(reduce128(self.0 as u128 * rhs.0 as u128))
    }
}

impl MulAssign for Fp {
    #[inline(always)]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Polynomial evaluation: sum c_i * x^i using Horner's method.
///
/// An empty coefficient list is the zero polynomial.
pub fn poly_eval(coeffs: &[Fp], x: Fp) -> Fp {
    let mut result = Fp::ZERO;
    for &c in coeffs.iter().rev() {
        result = result * x + c;
    }
    result
}
