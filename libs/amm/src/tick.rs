//! Trade -> candle/volume tick conversion (§4.5 step 1): turns a derived
//! [`Trade`] into the `{tsSec, priceQuotePerBase, volumeQuote}` triple the
//! aggregators fold into buckets. Pure function, no state.

use rust_decimal::Decimal;
use types::{Atoms, Pool, Trade};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub ts_sec: i64,
    pub price_quote_per_base: Decimal,
    pub volume_quote: Decimal,
}

/// Drops the trade if its mints don't form a valid `(base, quote)` pair
/// against `pool`, or if either leg's amount is missing.
pub fn tick_from_trade(trade: &Trade, pool: &Pool) -> Option<Tick> {
    let in_mint = trade.in_mint.as_ref()?;
    let out_mint = trade.out_mint.as_ref()?;
    let amount_in = trade.amount_in_atoms.as_ref()?;
    let amount_out = trade.amount_out_atoms.as_ref()?;

    let (price_quote_per_base, volume_quote) = if in_mint == &pool.quote_mint && out_mint == &pool.base_mint {
        let price = Atoms::ui_ratio(amount_in, pool.quote_decimals, amount_out, pool.base_decimals)?;
        let volume = amount_in.to_ui_decimal(pool.quote_decimals)?;
        (price, volume)
    } else if in_mint == &pool.base_mint && out_mint == &pool.quote_mint {
        let price = Atoms::ui_ratio(amount_out, pool.quote_decimals, amount_in, pool.base_decimals)?;
        let volume = amount_out.to_ui_decimal(pool.quote_decimals)?;
        (price, volume)
    } else {
        return None;
    };

    let ts_sec = trade.block_time.unwrap_or_else(now_sec_fallback);
    Some(Tick { ts_sec, price_quote_per_base, volume_quote })
}

/// `nowSec()` substitute for a trade with no `blockTime` (§4.4 tie-break).
/// Callers that can supply a better wall clock should do so; this exists so
/// the pure tick conversion never panics or divides by a missing timestamp.
fn now_sec_fallback() -> i64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Pubkey, Q64_64, Signature};

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

    fn trade_with(in_mint: Pubkey, out_mint: Pubkey, amount_in: &str, amount_out: &str) -> Trade {
        Trade {
            signature: Signature::new_unchecked("sig1"),
            slot: 1,
            block_time: Some(1_700_000_000),
            pool_id: Pubkey::new_unchecked("11111111111111111111111111111111111111111P"),
            user: None,
            in_mint: Some(in_mint),
            out_mint: Some(out_mint),
            amount_in_atoms: Some(Atoms::parse(amount_in).unwrap()),
            amount_out_atoms: Some(Atoms::parse(amount_out).unwrap()),
        }
    }

    #[test]
    fn quote_in_base_out_yields_positive_price() {
        let pool = sample_pool();
        let trade = trade_with(pool.quote_mint.clone(), pool.base_mint.clone(), "1000000", "500000000");
        let tick = tick_from_trade(&trade, &pool).unwrap();
        assert!(tick.price_quote_per_base > Decimal::ZERO);
        assert!(tick.volume_quote > Decimal::ZERO);
    }

    #[test]
    fn mismatched_mints_drop_the_tick() {
        let pool = sample_pool();
        let stray = Pubkey::new_unchecked("99999999999999999999999999999999999999999Z");
        let trade = trade_with(pool.base_mint.clone(), stray, "1000000", "500000000");
        assert!(tick_from_trade(&trade, &pool).is_none());
    }
}
