//! Volume Aggregator (C8): rolling per-timeframe quote-volume windows, kept
//! purely in memory — there is no persisted `dex_pool_volume` table, the
//! windows back live reads only (the WS hub, a routing façade).

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use types::{Pool, Trade, VolumeTimeframe, VolumeWindow};

pub struct VolumeAggregator {
    pool: Pool,
    windows: DashMap<VolumeTimeframe, VolumeWindow>,
}

impl VolumeAggregator {
    pub fn new(pool: Pool) -> Self {
        let windows = DashMap::new();
        for timeframe in VolumeTimeframe::ALL {
            windows.insert(timeframe, VolumeWindow::new(timeframe));
        }
        Self { pool, windows }
    }

    pub fn total(&self, timeframe: VolumeTimeframe) -> rust_decimal::Decimal {
        self.windows.get(&timeframe).map(|w| w.total()).unwrap_or_default()
    }

    fn apply_trade(&self, trade: &Trade) {
        let Some(tick) = amm::tick_from_trade(trade, &self.pool) else {
            return;
        };
        for mut window in self.windows.iter_mut() {
            window.record(tick.ts_sec, tick.volume_quote);
        }
    }

    /// Runs until `token` cancels. A periodic tick evicts stale buckets
    /// even when no trade arrives, so an idle pool's windows still decay.
    pub async fn run(self, mut trades: broadcast::Receiver<Trade>, evict_interval: std::time::Duration, token: CancellationToken) {
        let mut ticker = interval(evict_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {
                    let now = now_unix_sec();
                    for mut window in self.windows.iter_mut() {
                        let tf_sec = window.timeframe().seconds();
                        window.evict_before(now - tf_sec);
                    }
                }
                trade = trades.recv() => {
                    match trade {
                        Ok(trade) if trade.pool_id == self.pool.pool_id => self.apply_trade(&trade),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(pool = %self.pool.pool_id, skipped, "volume aggregator lagged behind trade broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    }
}

fn now_unix_sec() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
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

    #[test]
    fn trade_adds_to_every_window() {
        let pool = sample_pool();
        let aggregator = VolumeAggregator::new(pool.clone());
        let trade = Trade {
            signature: Signature::new_unchecked("sig1"),
            slot: 1,
            block_time: Some(1_700_000_000),
            pool_id: pool.pool_id.clone(),
            user: None,
            in_mint: Some(pool.quote_mint.clone()),
            out_mint: Some(pool.base_mint.clone()),
            amount_in_atoms: Some(types::Atoms::parse("1000000").unwrap()),
            amount_out_atoms: Some(types::Atoms::parse("500000000").unwrap()),
        };
        aggregator.apply_trade(&trade);
        assert!(aggregator.total(VolumeTimeframe::M1) > rust_decimal::Decimal::ZERO);
        assert!(aggregator.total(VolumeTimeframe::H24) > rust_decimal::Decimal::ZERO);
    }
}
