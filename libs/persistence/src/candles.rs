//! `dex_pool_candles` (§6 downstream): batched upsert on
//! `(pool_id, timeframe, bucket_start_sec)`. Last-writer-wins is correct
//! here because each bucket's OHLC/volume is produced by the aggregator's
//! in-memory fold, which only ever advances monotonically for a given
//! bucket (§4.7, C7).

use bigdecimal::BigDecimal;
use sqlx::PgConnection;

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct CandleUpsert {
    pub pool_id: String,
    pub timeframe: String,
    pub bucket_start_sec: i64,
    pub open: BigDecimal,
    pub high: BigDecimal,
    pub low: BigDecimal,
    pub close: BigDecimal,
    pub volume_quote: BigDecimal,
    pub trades_count: i32,
}

/// Upsert one dirty-tracked candle. Called per bucket from the aggregator's
/// flush timer, not per trade — see `candles_flush_ms` in `IndexerConfig`.
pub async fn upsert_candle(ex: &mut PgConnection, candle: &CandleUpsert) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
INSERT INTO dex_pool_candles (
    pool_id, timeframe, bucket_start_sec, open, high, low, close, volume_quote, trades_count, updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
ON CONFLICT (pool_id, timeframe, bucket_start_sec) DO UPDATE SET
    high = GREATEST(dex_pool_candles.high, EXCLUDED.high),
    low = LEAST(dex_pool_candles.low, EXCLUDED.low),
    close = EXCLUDED.close,
    volume_quote = EXCLUDED.volume_quote,
    trades_count = EXCLUDED.trades_count,
    updated_at = now()
"#,
    )
    .bind(&candle.pool_id)
    .bind(&candle.timeframe)
    .bind(candle.bucket_start_sec)
    .bind(&candle.open)
    .bind(&candle.high)
    .bind(&candle.low)
    .bind(&candle.close)
    .bind(&candle.volume_quote)
    .bind(candle.trades_count)
    .execute(ex)
    .await?;
    Ok(())
}

/// Flush a batch of dirty buckets in one round trip. The aggregator only
/// ever hands this function buckets it has touched since the last flush.
pub async fn upsert_candles(ex: &mut PgConnection, candles: &[CandleUpsert]) -> Result<(), PersistenceError> {
    for candle in candles {
        upsert_candle(ex, candle).await?;
    }
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandleRow {
    pub pool_id: String,
    pub timeframe: String,
    pub bucket_start_sec: i64,
    pub open: BigDecimal,
    pub high: BigDecimal,
    pub low: BigDecimal,
    pub close: BigDecimal,
    pub volume_quote: BigDecimal,
    pub trades_count: i32,
}

/// Candles for `pool_id`/`timeframe` in `[since_sec, until_sec)`, ascending
/// by bucket. Gap-filling (§4.7's "missing buckets repeat the prior close")
/// is the aggregator's read-path concern, not this query's.
pub async fn get_candles(
    ex: &mut PgConnection,
    pool_id: &str,
    timeframe: &str,
    since_sec: i64,
    until_sec: i64,
) -> Result<Vec<CandleRow>, PersistenceError> {
    let rows = sqlx::query_as(
        r#"
SELECT pool_id, timeframe, bucket_start_sec, open, high, low, close, volume_quote, trades_count
FROM dex_pool_candles
WHERE pool_id = $1 AND timeframe = $2 AND bucket_start_sec >= $3 AND bucket_start_sec < $4
ORDER BY bucket_start_sec ASC
"#,
    )
    .bind(pool_id)
    .bind(timeframe)
    .bind(since_sec)
    .bind(until_sec)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}
