//! FeeUi: per-pool, UI-denominated fee-vault balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeUi {
    pub creator: Decimal,
    pub holders: Decimal,
    pub nft: Decimal,
    pub last_refresh_ms: i64,
}

impl FeeUi {
    pub fn zero(now_ms: i64) -> Self {
        Self {
            creator: Decimal::ZERO,
            holders: Decimal::ZERO,
            nft: Decimal::ZERO,
            last_refresh_ms: now_ms,
        }
    }
}
