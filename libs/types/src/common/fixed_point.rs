//! Fixed-point price representation for on-chain concentrated-liquidity pools.
//!
//! Prices inside the AMM program are stored as `Q64.64`: the low 64 bits are
//! the fractional component, so a price `p` is encoded as `round(p * 2^64)`.
//! We keep the raw `u128` around for exact comparisons (slot-gating, bucket
//! keys) and only convert to `Decimal` at the UI/serialization boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::errors::FixedPointError;

/// `Q64.64` fixed-point price, `quote per base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Q64_64(pub u128);

impl Q64_64 {
    /// Number of fractional bits.
    pub const FRACTIONAL_BITS: u32 = 64;
    pub const ONE: Self = Self(1u128 << Self::FRACTIONAL_BITS);
    pub const ZERO: Self = Self(0);

    /// Build from a raw on-chain `u128`.
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Encode a decimal price as `Q64.64`, rounding to nearest.
    pub fn from_decimal(price: Decimal) -> Result<Self, FixedPointError> {
        if price.is_sign_negative() {
            return Err(FixedPointError::Underflow {
                value: price.to_f64().unwrap_or(f64::NEG_INFINITY),
            });
        }
        let scale = Decimal::from(1u128 << 64);
        let scaled = price * scale;
        let raw = scaled
            .round()
            .to_u128()
            .ok_or_else(|| FixedPointError::Overflow {
                value: price.to_f64().unwrap_or(f64::INFINITY),
            })?;
        Ok(Self(raw))
    }

    /// Decode to a `Decimal` price (quote per base), for UI/serialization use.
    pub fn to_decimal(self) -> Decimal {
        let numerator = Decimal::from(self.0);
        let denominator = Decimal::from(1u128 << 64);
        numerator / denominator
    }
}

impl fmt::Display for Q64_64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_decimal() {
        let q = Q64_64::from_decimal(dec!(0.003)).unwrap();
        let back = q.to_decimal();
        assert!((back - dec!(0.003)).abs() < dec!(0.0000001));
    }

    #[test]
    fn one_is_identity() {
        assert_eq!(Q64_64::ONE.to_decimal(), Decimal::from(1));
    }

    #[test]
    fn rejects_negative_price() {
        assert!(Q64_64::from_decimal(dec!(-1)).is_err());
    }
}
