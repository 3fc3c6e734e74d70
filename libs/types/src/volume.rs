//! Volume window: per `(poolId, timeframe)` sliding sum of quote volume.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Timeframes tracked by the Volume Aggregator (C8). Shares the candle
/// timeframes and additionally tracks `24h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeTimeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    H24,
}

impl VolumeTimeframe {
    pub const ALL: [VolumeTimeframe; 8] = [
        VolumeTimeframe::M1,
        VolumeTimeframe::M5,
        VolumeTimeframe::M15,
        VolumeTimeframe::M30,
        VolumeTimeframe::H1,
        VolumeTimeframe::H4,
        VolumeTimeframe::D1,
        VolumeTimeframe::H24,
    ];

    pub const fn seconds(self) -> i64 {
        match self {
            VolumeTimeframe::M1 => 60,
            VolumeTimeframe::M5 => 5 * 60,
            VolumeTimeframe::M15 => 15 * 60,
            VolumeTimeframe::M30 => 30 * 60,
            VolumeTimeframe::H1 => 60 * 60,
            VolumeTimeframe::H4 => 4 * 60 * 60,
            VolumeTimeframe::D1 => 24 * 60 * 60,
            VolumeTimeframe::H24 => 24 * 60 * 60,
        }
    }
}

/// A single second-resolution bucket in the sliding-window accumulator.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    ts_sec: i64,
    volume_quote: Decimal,
}

/// Time-bucketed sliding sum of `volumeQuote` over the most recent `tfSec`
/// seconds. Buckets older than the window are evicted lazily on read/write.
#[derive(Debug, Clone)]
pub struct VolumeWindow {
    timeframe: VolumeTimeframe,
    buckets: std::collections::VecDeque<Bucket>,
    running_total: Decimal,
}

impl VolumeWindow {
    pub fn new(timeframe: VolumeTimeframe) -> Self {
        Self {
            timeframe,
            buckets: std::collections::VecDeque::new(),
            running_total: Decimal::ZERO,
        }
    }

    /// Record a trade's quote volume at `ts_sec`, then evict anything that
    /// has aged out of the window.
    pub fn record(&mut self, ts_sec: i64, volume_quote: Decimal) {
        match self.buckets.back_mut() {
            Some(last) if last.ts_sec == ts_sec => {
                last.volume_quote += volume_quote;
            }
            _ => {
                self.buckets.push_back(Bucket { ts_sec, volume_quote });
            }
        }
        self.running_total += volume_quote;
        self.evict_before(ts_sec - self.timeframe.seconds());
    }

    /// Evict buckets at or before `cutoff_ts_sec`, typically called from a
    /// periodic tick even when no new trade has arrived.
    pub fn evict_before(&mut self, cutoff_ts_sec: i64) {
        while let Some(front) = self.buckets.front() {
            if front.ts_sec <= cutoff_ts_sec {
                self.running_total -= front.volume_quote;
                self.buckets.pop_front();
            } else {
                break;
            }
        }
        if self.buckets.is_empty() {
            self.running_total = Decimal::ZERO;
        }
    }

    pub fn total(&self) -> Decimal {
        self.running_total
    }

    pub fn timeframe(&self) -> VolumeTimeframe {
        self.timeframe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn window_sums_within_range_and_evicts_stale() {
        let mut w = VolumeWindow::new(VolumeTimeframe::M1);
        w.record(0, dec!(10));
        w.record(30, dec!(5));
        assert_eq!(w.total(), dec!(15));
        // 61s later, the t=0 sample has aged out of a 60s window.
        w.record(61, dec!(1));
        assert_eq!(w.total(), dec!(6));
    }

    #[test]
    fn idle_eviction_without_new_trade() {
        let mut w = VolumeWindow::new(VolumeTimeframe::M1);
        w.record(0, dec!(10));
        w.evict_before(60);
        assert_eq!(w.total(), Decimal::ZERO);
    }
}
