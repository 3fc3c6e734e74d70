//! Trade: derived once per `(signature, poolId)` by the Trade Deriver.

use serde::{Deserialize, Serialize};

use crate::common::{Atoms, Pubkey, Signature};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub pool_id: Pubkey,
    pub user: Option<Pubkey>,
    pub in_mint: Option<Pubkey>,
    pub out_mint: Option<Pubkey>,
    pub amount_in_atoms: Option<Atoms>,
    pub amount_out_atoms: Option<Atoms>,
}

impl Trade {
    /// A trade is "fully populated" when both legs and both amounts are
    /// known; see §3 invariants. Partial trades are never produced by the
    /// Trade Deriver but the type allows for the raw-fallback bookkeeping
    /// path where a signature is recorded without full enrichment.
    pub fn is_fully_populated(&self) -> bool {
        self.in_mint.is_some()
            && self.out_mint.is_some()
            && self
                .amount_in_atoms
                .as_ref()
                .map(|a| !a.is_zero())
                .unwrap_or(false)
            && self
                .amount_out_atoms
                .as_ref()
                .map(|a| !a.is_zero())
                .unwrap_or(false)
    }

    /// `blockTime` substituted with `nowSec()` when the RPC didn't supply one
    /// (§4.4 edge cases) — never zero.
    pub fn effective_block_time(&self, now_sec: i64) -> i64 {
        self.block_time.unwrap_or(now_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_trade_is_not_fully_populated() {
        let trade = Trade {
            signature: Signature::new_unchecked("sig"),
            slot: 1,
            block_time: None,
            pool_id: Pubkey::new_unchecked("pool"),
            user: None,
            in_mint: None,
            out_mint: None,
            amount_in_atoms: None,
            amount_out_atoms: None,
        };
        assert!(!trade.is_fully_populated());
    }

    #[test]
    fn missing_block_time_falls_back_to_now() {
        let trade = Trade {
            signature: Signature::new_unchecked("sig"),
            slot: 1,
            block_time: None,
            pool_id: Pubkey::new_unchecked("pool"),
            user: None,
            in_mint: None,
            out_mint: None,
            amount_in_atoms: None,
            amount_out_atoms: None,
        };
        assert_eq!(trade.effective_block_time(12345), 12345);
    }
}
