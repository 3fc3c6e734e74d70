//! Base58 identifiers: public keys and transaction signatures.
//!
//! On-chain addresses are opaque 32-byte values; we render them as base58
//! strings everywhere outside of wire decoding, the same way the RPC layer
//! hands them to us. `Pubkey` is a thin validated wrapper, not a bijective
//! encoding scheme — there is nothing to derive from it beyond its bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::errors::ValidationError;

/// A 32-byte on-chain public key, stored base58-encoded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pubkey(String);

impl Pubkey {
    /// Wrap an already-validated base58 string without re-checking it.
    ///
    /// Used when constructing from RPC responses that are trusted to be
    /// well-formed; prefer [`Pubkey::parse`] for untrusted input.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ValidationError::InvalidBase58(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(ValidationError::WrongLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let decoded = bs58::decode(&self.0).into_vec().expect("validated on construction");
        let mut out = [0u8; 32];
        out.copy_from_slice(&decoded);
        out
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pubkey {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A transaction signature, base58-encoded. Unlike [`Pubkey`] it is never a
/// *global* unique key for derived facts — see [`crate::trade::Trade`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `(signature, pool)` dedup key used throughout the Ingestion Engine.
    pub fn dedup_key(&self, pool: &Pubkey) -> String {
        format!("{}:{}", self.0, pool.as_str())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes() {
        let bytes = [7u8; 32];
        let pk = Pubkey::from_bytes(&bytes);
        assert_eq!(pk.to_bytes(), bytes);
    }

    #[test]
    fn rejects_wrong_length() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert!(matches!(
            Pubkey::parse(&short),
            Err(ValidationError::WrongLength { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn dedup_key_includes_pool() {
        let sig = Signature::new_unchecked("sig1");
        let pool = Pubkey::new_unchecked("poolA");
        assert_eq!(sig.dedup_key(&pool), "sig1:poolA");
    }
}
