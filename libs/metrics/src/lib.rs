//! Process-wide counters (§C.3): incremented from whichever worker produces
//! the fact, read by the supervisor for periodic logging or an external
//! scrape. Counters only grow — restart, don't reset, to clear them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Metrics {
    events_decoded: AtomicU64,
    trades_derived: AtomicU64,
    dedup_hits: AtomicU64,
    rpc_retries: AtomicU64,
}

/// A point-in-time read of [`Metrics`], serializable for a log line or a
/// façade response.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub events_decoded: u64,
    pub trades_derived: u64,
    pub dedup_hits: u64,
    pub rpc_retries: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_events_decoded(&self, count: u64) {
        if count > 0 {
            self.events_decoded.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_trade_derived(&self) {
        self.trades_derived.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dedup_hit(&self) {
        self.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_retry(&self) {
        self.rpc_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_decoded: self.events_decoded.load(Ordering::Relaxed),
            trades_derived: self.trades_derived.load(Ordering::Relaxed),
            dedup_hits: self.dedup_hits.load(Ordering::Relaxed),
            rpc_retries: self.rpc_retries.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new();
        let snap = metrics.snapshot();
        assert_eq!(snap.events_decoded, 0);
        assert_eq!(snap.rpc_retries, 0);
    }

    #[test]
    fn increments_are_visible_in_snapshot() {
        let metrics = Metrics::new();
        metrics.record_events_decoded(3);
        metrics.record_trade_derived();
        metrics.record_dedup_hit();
        metrics.record_rpc_retry();
        metrics.record_rpc_retry();

        let snap = metrics.snapshot();
        assert_eq!(snap.events_decoded, 3);
        assert_eq!(snap.trades_derived, 1);
        assert_eq!(snap.dedup_hits, 1);
        assert_eq!(snap.rpc_retries, 2);
    }
}
