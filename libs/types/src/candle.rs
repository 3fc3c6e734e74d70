//! Candle: OHLCV bucket for a `(pool, timeframe)` pair.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::Pubkey;

/// Fixed set of candle timeframes. The volume aggregator (C8) additionally
/// tracks `24h`, which is not a candle timeframe and lives in [`crate::volume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub const fn seconds(self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H4 => 4 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tf| tf.as_str() == s)
    }

    /// `bucketStartSec = floor(tsSec / tfSec) * tfSec`.
    pub fn bucket_start(self, ts_sec: i64) -> i64 {
        let tf = self.seconds();
        ts_sec.div_euclid(tf) * tf
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub pool_id: Pubkey,
    pub timeframe: Timeframe,
    pub bucket_start_sec: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume_quote: Decimal,
    pub trades_count: u64,
    pub updated_at_ms: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CandleInvariantError {
    #[error("open {open} not within [low={low}, high={high}]")]
    OpenOutOfRange { open: String, low: String, high: String },
    #[error("close {close} not within [low={low}, high={high}]")]
    CloseOutOfRange { close: String, low: String, high: String },
    #[error("volume_quote is negative: {0}")]
    NegativeVolume(String),
    #[error("trades_count is zero")]
    ZeroTrades,
}

impl Candle {
    pub fn new_from_tick(
        pool_id: Pubkey,
        timeframe: Timeframe,
        bucket_start_sec: i64,
        price: Decimal,
        volume_quote: Decimal,
        updated_at_ms: i64,
    ) -> Self {
        Self {
            pool_id,
            timeframe,
            bucket_start_sec,
            open: price,
            high: price,
            low: price,
            close: price,
            volume_quote,
            trades_count: 1,
            updated_at_ms,
        }
    }

    pub fn apply_tick(&mut self, price: Decimal, volume_quote: Decimal, updated_at_ms: i64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume_quote += volume_quote;
        self.trades_count += 1;
        self.updated_at_ms = updated_at_ms;
    }

    /// A flat, zero-volume candle used to fill a gap between two persisted
    /// buckets (§4.5 read contract).
    pub fn flat_gap_fill(
        pool_id: Pubkey,
        timeframe: Timeframe,
        bucket_start_sec: i64,
        prev_close: Decimal,
        updated_at_ms: i64,
    ) -> Self {
        Self {
            pool_id,
            timeframe,
            bucket_start_sec,
            open: prev_close,
            high: prev_close,
            low: prev_close,
            close: prev_close,
            volume_quote: Decimal::ZERO,
            trades_count: 0,
            updated_at_ms,
        }
    }

    /// §8 property 4: `open,close ∈ [low, high]`, `volumeQuote ≥ 0`,
    /// `tradesCount ≥ 1`. Gap-filled candles are exempt from the trade-count
    /// floor (they represent "nothing happened").
    pub fn validate(&self, allow_zero_trades: bool) -> Result<(), CandleInvariantError> {
        if self.open < self.low || self.open > self.high {
            return Err(CandleInvariantError::OpenOutOfRange {
                open: self.open.to_string(),
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        if self.close < self.low || self.close > self.high {
            return Err(CandleInvariantError::CloseOutOfRange {
                close: self.close.to_string(),
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        if self.volume_quote < Decimal::ZERO {
            return Err(CandleInvariantError::NegativeVolume(self.volume_quote.to_string()));
        }
        if !allow_zero_trades && self.trades_count == 0 {
            return Err(CandleInvariantError::ZeroTrades);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bucket_start_floors_to_timeframe() {
        assert_eq!(Timeframe::M1.bucket_start(125), 120);
        assert_eq!(Timeframe::H1.bucket_start(3661), 3600);
    }

    #[test]
    fn apply_tick_tracks_high_low_close() {
        let mut c = Candle::new_from_tick(
            Pubkey::new_unchecked("p"),
            Timeframe::M1,
            0,
            dec!(1.0),
            dec!(10),
            0,
        );
        c.apply_tick(dec!(1.5), dec!(5), 1);
        c.apply_tick(dec!(0.5), dec!(5), 2);
        assert_eq!(c.high, dec!(1.5));
        assert_eq!(c.low, dec!(0.5));
        assert_eq!(c.close, dec!(0.5));
        assert_eq!(c.volume_quote, dec!(20));
        assert_eq!(c.trades_count, 3);
        assert!(c.validate(false).is_ok());
    }

    #[test]
    fn gap_fill_is_flat_and_valid_with_zero_trades() {
        let c = Candle::flat_gap_fill(Pubkey::new_unchecked("p"), Timeframe::M1, 60, dec!(2.0), 5);
        assert_eq!(c.trades_count, 0);
        assert!(c.validate(true).is_ok());
        assert!(c.validate(false).is_err());
    }
}
