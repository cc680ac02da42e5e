//! Core arithmetic.
//!
//! - `field`: prime field GF(2^61 - 1) used by the sharing engine.

pub mod field;

pub use field::{Fp, MODULUS};
