//! Arbitrary-precision token-atom arithmetic.
//!
//! Every amount in vault-delta math, every volume accumulator, every candle
//! aggregate and staking balance is computed in arbitrary precision and only
//! narrowed to a fixed-width type at a serialization boundary. `Atoms` wraps
//! `BigUint` (a stored, non-negative balance); `AtomsDelta` wraps `BigInt`
//! (a signed change, e.g. `post - pre`).

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Atoms(BigUint);

impl Atoms {
    pub const ZERO: &'static str = "0";

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_biguint(v: BigUint) -> Self {
        Self(v)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse the raw integer string from `uiTokenAmount.amount`.
    pub fn parse(raw: &str) -> Result<Self, AtomsParseError> {
        BigUint::from_str(raw)
            .map(Self)
            .map_err(|_| AtomsParseError::NotAnInteger(raw.to_string()))
    }

    pub fn checked_add(&self, other: &Atoms) -> Self {
        Self(&self.0 + &other.0)
    }

    /// Divide two atom counts, each scaled by their own token decimals, to a
    /// `Decimal` ratio suitable for price/volume math. Returns `None` if
    /// either UI-scale conversion overflows `Decimal`'s range (practically
    /// unreachable for real token supplies).
    pub fn ui_ratio(
        numerator: &Atoms,
        numerator_decimals: u8,
        denominator: &Atoms,
        denominator_decimals: u8,
    ) -> Option<rust_decimal::Decimal> {
        let num = to_decimal(&numerator.0, numerator_decimals)?;
        let den = to_decimal(&denominator.0, denominator_decimals)?;
        if den.is_zero() {
            return None;
        }
        Some(num / den)
    }

    pub fn to_ui_decimal(&self, decimals: u8) -> Option<rust_decimal::Decimal> {
        to_decimal(&self.0, decimals)
    }
}

fn to_decimal(v: &BigUint, decimals: u8) -> Option<rust_decimal::Decimal> {
    use rust_decimal::Decimal;
    // BigUint -> decimal string -> Decimal, scaled by decimals. Avoids
    // intermediate f64 conversion, which would lose precision for large
    // token supplies.
    let digits = v.to_string();
    let decimal = Decimal::from_str(&digits).ok()?;
    let scale = Decimal::from(10u64.checked_pow(decimals as u32)?);
    Some(decimal / scale)
}

impl fmt::Display for Atoms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed change in atom balance, e.g. `post_balance - pre_balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomsDelta(BigInt);

impl AtomsDelta {
    pub fn from_pre_post(pre: &Atoms, post: &Atoms) -> Self {
        let pre = BigInt::from_biguint(Sign::Plus, pre.0.clone());
        let post = BigInt::from_biguint(Sign::Plus, post.0.clone());
        Self(post - pre)
    }

    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Magnitude as an unsigned [`Atoms`], discarding the sign.
    pub fn magnitude(&self) -> Atoms {
        Atoms(self.0.magnitude().clone())
    }

    /// `-self`, used to flip a vault-side decrease into a user-side increase.
    pub fn negate(&self) -> Self {
        Self(-self.0.clone())
    }
}

impl fmt::Display for AtomsDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AtomsParseError {
    #[error("'{0}' is not a valid non-negative integer")]
    NotAnInteger(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_sign_tracks_direction() {
        let pre = Atoms::parse("100").unwrap();
        let post = Atoms::parse("101").unwrap();
        let delta = AtomsDelta::from_pre_post(&pre, &post);
        assert!(delta.is_positive());
        assert_eq!(delta.magnitude(), Atoms::parse("1").unwrap());
    }

    #[test]
    fn decrease_is_negative() {
        let pre = Atoms::parse("1000").unwrap();
        let post = Atoms::parse("997").unwrap();
        let delta = AtomsDelta::from_pre_post(&pre, &post);
        assert!(delta.is_negative());
        assert_eq!(delta.magnitude(), Atoms::parse("3").unwrap());
    }

    #[test]
    fn ui_ratio_matches_decimals() {
        let amount_in = Atoms::parse("1000000000").unwrap(); // 1.0 @ 9 decimals
        let amount_out = Atoms::parse("3000000").unwrap(); // 3.0 @ 6 decimals
        let price = Atoms::ui_ratio(&amount_out, 6, &amount_in, 9).unwrap();
        assert_eq!(price, rust_decimal::Decimal::new(3, 0));
    }
}
