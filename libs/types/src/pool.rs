//! Pool: a single AMM instance with a canonical `(baseMint, quoteMint)` pair.

use serde::{Deserialize, Serialize};

use crate::common::{Pubkey, Q64_64};

/// On-chain and cached pool state, as read through [Pool Reader][pool-reader].
///
/// [pool-reader]: ../../pool_reader/index.html
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub pool_id: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub lp_mint: Option<Pubkey>,
    pub creator_fee_vault: Pubkey,
    pub holders_fee_vault: Pubkey,
    pub nft_fee_vault: Pubkey,
    pub bin_step_bps: u16,
    pub active_bin: i32,
    pub price_q64_64: Q64_64,
    pub last_update_slot: u64,
}

/// Errors returned by [`Pool::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolInvariantError {
    #[error("decimals out of range: base={base}, quote={quote}")]
    DecimalsOutOfRange { base: u8, quote: u8 },
    #[error("base and quote mint are not in canonical order")]
    NotCanonicallyOrdered,
    #[error("base vault and quote vault must be distinct")]
    DuplicateVaults,
}

impl Pool {
    /// §3 invariants: `base < quote` lexicographically, decimals in `[0,18]`,
    /// vault addresses unique per pool.
    pub fn validate(&self) -> Result<(), PoolInvariantError> {
        if self.base_decimals > 18 || self.quote_decimals > 18 {
            return Err(PoolInvariantError::DecimalsOutOfRange {
                base: self.base_decimals,
                quote: self.quote_decimals,
            });
        }
        if self.base_mint.as_str() >= self.quote_mint.as_str() {
            return Err(PoolInvariantError::NotCanonicallyOrdered);
        }
        if self.base_vault == self.quote_vault {
            return Err(PoolInvariantError::DuplicateVaults);
        }
        Ok(())
    }

    /// True if `mint` is one of this pool's two sides.
    pub fn is_pool_mint(&self, mint: &Pubkey) -> bool {
        mint == &self.base_mint || mint == &self.quote_mint
    }

    pub fn other_mint(&self, mint: &Pubkey) -> Option<&Pubkey> {
        if mint == &self.base_mint {
            Some(&self.quote_mint)
        } else if mint == &self.quote_mint {
            Some(&self.base_mint)
        } else {
            None
        }
    }

    pub fn decimals_of(&self, mint: &Pubkey) -> Option<u8> {
        if mint == &self.base_mint {
            Some(self.base_decimals)
        } else if mint == &self.quote_mint {
            Some(self.quote_decimals)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> Pool {
        Pool {
            pool_id: Pubkey::new_unchecked("Pool1"),
            base_mint: Pubkey::new_unchecked("AAAA"),
            quote_mint: Pubkey::new_unchecked("BBBB"),
            base_decimals: 9,
            quote_decimals: 6,
            base_vault: Pubkey::new_unchecked("VaultA"),
            quote_vault: Pubkey::new_unchecked("VaultB"),
            lp_mint: None,
            creator_fee_vault: Pubkey::new_unchecked("FeeC"),
            holders_fee_vault: Pubkey::new_unchecked("FeeH"),
            nft_fee_vault: Pubkey::new_unchecked("FeeN"),
            bin_step_bps: 10,
            active_bin: 0,
            price_q64_64: Q64_64::ZERO,
            last_update_slot: 0,
        }
    }

    #[test]
    fn valid_pool_passes() {
        assert!(sample_pool().validate().is_ok());
    }

    #[test]
    fn rejects_non_canonical_order() {
        let mut pool = sample_pool();
        std::mem::swap(&mut pool.base_mint, &mut pool.quote_mint);
        assert_eq!(pool.validate(), Err(PoolInvariantError::NotCanonicallyOrdered));
    }

    #[test]
    fn rejects_duplicate_vaults() {
        let mut pool = sample_pool();
        pool.quote_vault = pool.base_vault.clone();
        assert_eq!(pool.validate(), Err(PoolInvariantError::DuplicateVaults));
    }

    #[test]
    fn rejects_excess_decimals() {
        let mut pool = sample_pool();
        pool.base_decimals = 19;
        assert!(matches!(
            pool.validate(),
            Err(PoolInvariantError::DecimalsOutOfRange { .. })
        ));
    }
}
