//! Candle Aggregator (C7): per-pool current bucket for every timeframe, a
//! dirty-tracked pending-upsert map, and a periodic flush to persistence.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use persistence::candles::CandleUpsert;
use persistence::numeric::{decimal_to_numeric, numeric_to_decimal};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use types::{Candle, Pool, Timeframe, Trade};

use crate::error::AggregatorError;

pub struct CandleAggregator {
    pool: Pool,
    current: DashMap<Timeframe, Candle>,
    pending: DashMap<(Timeframe, i64), Candle>,
    db: PgPool,
}

impl CandleAggregator {
    pub fn new(pool: Pool, db: PgPool) -> Self {
        Self { pool, current: DashMap::new(), pending: DashMap::new(), db }
    }

    /// Drives both halves of C7: consuming ticks as trades arrive, and
    /// flushing dirty buckets every `flush_interval` until `token` cancels.
    pub async fn run(self: Arc<Self>, mut trades: broadcast::Receiver<Trade>, flush_interval: Duration, token: CancellationToken) {
        let mut ticker = interval(flush_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    if let Err(e) = self.flush().await {
                        error!(pool = %self.pool.pool_id, error = %e, "final candle flush failed");
                    }
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.flush().await {
                        error!(pool = %self.pool.pool_id, error = %e, "candle flush failed");
                    }
                }
                trade = trades.recv() => {
                    match trade {
                        Ok(trade) if trade.pool_id == self.pool.pool_id => self.apply_trade(&trade),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(pool = %self.pool.pool_id, skipped, "candle aggregator lagged behind trade broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    }

    fn apply_trade(&self, trade: &Trade) {
        let Some(tick) = amm::tick_from_trade(trade, &self.pool) else {
            return;
        };
        let now_ms = tick.ts_sec * 1000;

        for timeframe in Timeframe::ALL {
            let bucket_start = timeframe.bucket_start(tick.ts_sec);

            let mut closed: Option<Candle> = None;
            self.current
                .entry(timeframe)
                .and_modify(|candle| {
                    if candle.bucket_start_sec == bucket_start {
                        candle.apply_tick(tick.price_quote_per_base, tick.volume_quote, now_ms);
                    } else {
                        closed = Some(candle.clone());
                        *candle = Candle::new_from_tick(self.pool.pool_id.clone(), timeframe, bucket_start, tick.price_quote_per_base, tick.volume_quote, now_ms);
                    }
                })
                .or_insert_with(|| Candle::new_from_tick(self.pool.pool_id.clone(), timeframe, bucket_start, tick.price_quote_per_base, tick.volume_quote, now_ms));

            if let Some(closed) = closed {
                self.pending.insert((timeframe, closed.bucket_start_sec), closed);
            }
            if let Some(current) = self.current.get(&timeframe) {
                self.pending.insert((timeframe, current.bucket_start_sec), current.clone());
            }
        }
    }

    async fn flush(&self) -> Result<(), AggregatorError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch: Vec<CandleUpsert> = self
            .pending
            .iter()
            .map(|entry| {
                let candle = entry.value();
                CandleUpsert {
                    pool_id: self.pool.pool_id.to_string(),
                    timeframe: candle.timeframe.as_str().to_string(),
                    bucket_start_sec: candle.bucket_start_sec,
                    open: decimal_to_numeric(candle.open),
                    high: decimal_to_numeric(candle.high),
                    low: decimal_to_numeric(candle.low),
                    close: decimal_to_numeric(candle.close),
                    volume_quote: decimal_to_numeric(candle.volume_quote),
                    trades_count: candle.trades_count as i32,
                }
            })
            .collect();

        let mut conn = self.db.acquire().await.map_err(persistence::PersistenceError::Database)?;
        persistence::candles::upsert_candles(&mut conn, &batch).await?;
        self.pending.clear();
        Ok(())
    }

    /// Read contract (§4.5 C7): the most recent `limit` buckets for
    /// `timeframe`, ascending, gap-filled, with the in-memory current bucket
    /// merged in as the freshest entry. Falls back to the in-memory bucket
    /// alone if persistence has nothing yet for this pool/timeframe.
    pub async fn get_candles(&self, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>, AggregatorError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let tf_sec = timeframe.seconds();
        let current = self.current.get(&timeframe).map(|c| c.clone());
        let until_sec = current.as_ref().map(|c| c.bucket_start_sec + tf_sec).unwrap_or_else(|| timeframe.bucket_start(now_unix_sec()) + tf_sec);
        let since_sec = until_sec - (limit as i64) * tf_sec;

        let mut conn = self.db.acquire().await.map_err(persistence::PersistenceError::Database)?;
        let rows = persistence::candles::get_candles(&mut conn, self.pool.pool_id.as_str(), timeframe.as_str(), since_sec, until_sec).await?;

        let mut persisted: Vec<Candle> = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(open) = numeric_to_decimal(&row.open) else { continue };
            let Some(high) = numeric_to_decimal(&row.high) else { continue };
            let Some(low) = numeric_to_decimal(&row.low) else { continue };
            let Some(close) = numeric_to_decimal(&row.close) else { continue };
            let Some(volume_quote) = numeric_to_decimal(&row.volume_quote) else { continue };
            persisted.push(Candle {
                pool_id: self.pool.pool_id.clone(),
                timeframe,
                bucket_start_sec: row.bucket_start_sec,
                open,
                high,
                low,
                close,
                volume_quote,
                trades_count: row.trades_count as u64,
                updated_at_ms: row.bucket_start_sec * 1000,
            });
        }

        Ok(merge_and_gap_fill(self.pool.pool_id.clone(), timeframe, persisted, current, limit))
    }
}

/// Gap-fills `persisted` (already ascending by `bucket_start_sec`), merges in
/// `current` as the freshest bucket, and trims to the most recent `limit`
/// entries. Pulled out of `get_candles` so the merge logic is testable
/// without a database.
fn merge_and_gap_fill(pool_id: types::Pubkey, timeframe: Timeframe, persisted: Vec<Candle>, current: Option<Candle>, limit: usize) -> Vec<Candle> {
    let tf_sec = timeframe.seconds();

    if persisted.is_empty() {
        return current.into_iter().collect();
    }

    let mut filled: Vec<Candle> = Vec::with_capacity(persisted.len());
    let mut prev_close = persisted[0].close;
    let mut next_expected = persisted[0].bucket_start_sec;
    for candle in persisted {
        while candle.bucket_start_sec > next_expected {
            filled.push(Candle::flat_gap_fill(pool_id.clone(), timeframe, next_expected, prev_close, next_expected * 1000));
            next_expected += tf_sec;
        }
        prev_close = candle.close;
        next_expected = candle.bucket_start_sec + tf_sec;
        filled.push(candle);
    }

    if let Some(current) = current {
        let last = filled.last().map(|c| (c.bucket_start_sec, c.close));
        match last {
            Some((last_start, _)) if last_start == current.bucket_start_sec => {
                if let Some(slot) = filled.last_mut() {
                    *slot = current;
                }
            }
            Some((last_start, last_close)) if last_start < current.bucket_start_sec => {
                let mut next_expected = last_start + tf_sec;
                while next_expected < current.bucket_start_sec {
                    filled.push(Candle::flat_gap_fill(pool_id.clone(), timeframe, next_expected, last_close, next_expected * 1000));
                    next_expected += tf_sec;
                }
                filled.push(current);
            }
            _ => {}
        }
    }

    if filled.len() > limit {
        let drop = filled.len() - limit;
        filled.drain(0..drop);
    }
    filled
}

fn now_unix_sec() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
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

    fn trade(sig: &str, ts_sec: i64, amount_in: &str, amount_out: &str) -> Trade {
        let pool = sample_pool();
        Trade {
            signature: Signature::new_unchecked(sig),
            slot: 1,
            block_time: Some(ts_sec),
            pool_id: pool.pool_id,
            user: None,
            in_mint: Some(pool.quote_mint),
            out_mint: Some(pool.base_mint),
            amount_in_atoms: Some(types::Atoms::parse(amount_in).unwrap()),
            amount_out_atoms: Some(types::Atoms::parse(amount_out).unwrap()),
        }
    }

    #[tokio::test]
    async fn single_tick_opens_every_timeframe_bucket() {
        let aggregator = CandleAggregator { pool: sample_pool(), current: DashMap::new(), pending: DashMap::new(), db: dummy_pool() };
        aggregator.apply_trade(&trade("sig1", 1_700_000_000, "1000000", "500000000"));
        assert_eq!(aggregator.current.len(), Timeframe::ALL.len());
        assert!(!aggregator.pending.is_empty());
    }

    #[tokio::test]
    async fn second_tick_in_same_bucket_updates_high_low() {
        let aggregator = CandleAggregator { pool: sample_pool(), current: DashMap::new(), pending: DashMap::new(), db: dummy_pool() };
        aggregator.apply_trade(&trade("sig1", 1_700_000_000, "1000000", "500000000"));
        aggregator.apply_trade(&trade("sig2", 1_700_000_010, "2000000", "500000000"));
        let m1 = aggregator.current.get(&Timeframe::M1).unwrap();
        assert_eq!(m1.trades_count, 2);
        assert!(m1.volume_quote > dec!(0));
    }

    fn dummy_pool() -> PgPool {
        // lazy pools never connect until first use; tests here never flush.
        PgPool::connect_lazy("postgres://localhost/unused").expect("lazy connect never touches the network")
    }

    fn candle(bucket_start_sec: i64, close: rust_decimal::Decimal, trades_count: u64) -> Candle {
        Candle {
            pool_id: Pubkey::new_unchecked("Pool1"),
            timeframe: Timeframe::M1,
            bucket_start_sec,
            open: close,
            high: close,
            low: close,
            close,
            volume_quote: dec!(1),
            trades_count,
            updated_at_ms: bucket_start_sec * 1000,
        }
    }

    #[test]
    fn gap_fill_synthesizes_missing_buckets_between_persisted_rows() {
        let persisted = vec![candle(0, dec!(1.0), 3), candle(180, dec!(2.0), 1)];
        let filled = merge_and_gap_fill(Pubkey::new_unchecked("Pool1"), Timeframe::M1, persisted, None, 10);

        assert_eq!(filled.len(), 4);
        assert_eq!(filled[0].bucket_start_sec, 0);
        assert_eq!(filled[1].bucket_start_sec, 60);
        assert_eq!(filled[1].trades_count, 0);
        assert_eq!(filled[1].close, dec!(1.0));
        assert_eq!(filled[2].bucket_start_sec, 120);
        assert_eq!(filled[2].trades_count, 0);
        assert_eq!(filled[3].bucket_start_sec, 180);
        assert_eq!(filled[3].trades_count, 1);
    }

    #[test]
    fn current_bucket_replaces_matching_last_persisted_row() {
        let persisted = vec![candle(0, dec!(1.0), 3)];
        let current = candle(0, dec!(1.5), 4);
        let filled = merge_and_gap_fill(Pubkey::new_unchecked("Pool1"), Timeframe::M1, persisted, Some(current), 10);

        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].trades_count, 4);
        assert_eq!(filled[0].close, dec!(1.5));
    }

    #[test]
    fn current_bucket_appended_and_gap_filled_after_last_persisted_row() {
        let persisted = vec![candle(0, dec!(1.0), 3)];
        let current = candle(180, dec!(3.0), 1);
        let filled = merge_and_gap_fill(Pubkey::new_unchecked("Pool1"), Timeframe::M1, persisted, Some(current), 10);

        assert_eq!(filled.len(), 4);
        assert_eq!(filled.last().unwrap().bucket_start_sec, 180);
        assert_eq!(filled.last().unwrap().close, dec!(3.0));
    }

    #[test]
    fn no_persisted_rows_falls_back_to_current_bucket_alone() {
        let current = candle(60, dec!(2.0), 1);
        let filled = merge_and_gap_fill(Pubkey::new_unchecked("Pool1"), Timeframe::M1, Vec::new(), Some(current), 10);
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].bucket_start_sec, 60);
    }

    #[test]
    fn no_persisted_rows_and_no_current_bucket_is_empty() {
        let filled = merge_and_gap_fill(Pubkey::new_unchecked("Pool1"), Timeframe::M1, Vec::new(), None, 10);
        assert!(filled.is_empty());
    }

    #[test]
    fn result_is_trimmed_to_the_most_recent_limit_entries() {
        let persisted = vec![candle(0, dec!(1.0), 1), candle(60, dec!(1.1), 1), candle(120, dec!(1.2), 1)];
        let filled = merge_and_gap_fill(Pubkey::new_unchecked("Pool1"), Timeframe::M1, persisted, None, 2);
        assert_eq!(filled.len(), 2);
        assert_eq!(filled[0].bucket_start_sec, 60);
        assert_eq!(filled[1].bucket_start_sec, 120);
    }
}
