//! Per-pool ring buffer of derived trades (§3, §5): capped at 500, newest
//! first, a shared dedup set guarding append. Readers get a copy-on-read
//! snapshot of the prefix they asked for — the ring itself is never handed
//! out by reference, so a slow WS client can't hold a lock open.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use types::Trade;

use crate::dedup::DedupSet;

pub const RING_CAPACITY: usize = 500;

pub struct TradeStore {
    rings: DashMap<String, Arc<RwLock<VecDeque<Trade>>>>,
    dedup: DedupSet,
}

impl TradeStore {
    pub fn new() -> Self {
        Self { rings: DashMap::new(), dedup: DedupSet::new() }
    }

    pub fn has_seen(&self, dedup_key: &str) -> bool {
        self.dedup.has_seen(dedup_key)
    }

    /// Appends `trade` to its pool's ring and marks `dedup_key` seen at
    /// `slot`, as a single critical section (§5: "per-pool append and the
    /// dedup-set insertion must be atomic relative to each other").
    pub async fn insert(&self, dedup_key: String, slot: u64, trade: Trade) {
        let ring = self.rings.entry(trade.pool_id.to_string()).or_insert_with(|| Arc::new(RwLock::new(VecDeque::with_capacity(RING_CAPACITY)))).clone();
        let mut guard = ring.write().await;
        guard.push_front(trade);
        if guard.len() > RING_CAPACITY {
            guard.pop_back();
        }
        drop(guard);
        self.dedup.mark_seen(dedup_key, slot);
    }

    /// Marks a signature processed without recording a trade — the
    /// non-swap path (§8 property 2): no trade stored, dedup still
    /// advances so the signature isn't reprocessed.
    pub fn mark_processed_no_trade(&self, dedup_key: String, slot: u64) {
        self.dedup.mark_seen(dedup_key, slot);
    }

    /// Up-to-`limit` most recent trades for `pool_id`, newest-first.
    pub async fn recent(&self, pool_id: &str, limit: usize) -> Vec<Trade> {
        match self.rings.get(pool_id) {
            Some(ring) => {
                let guard = ring.read().await;
                guard.iter().take(limit).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn compact_dedup(&self, below_slot: u64) {
        self.dedup.compact(below_slot);
    }

    pub fn dedup_len(&self) -> usize {
        self.dedup.len()
    }
}

impl Default for TradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Pubkey, Signature};

    fn trade(sig: &str, pool: &str) -> Trade {
        Trade {
            signature: Signature::new_unchecked(sig),
            slot: 1,
            block_time: Some(1),
            pool_id: Pubkey::new_unchecked(pool),
            user: None,
            in_mint: None,
            out_mint: None,
            amount_in_atoms: None,
            amount_out_atoms: None,
        }
    }

    #[tokio::test]
    async fn stores_newest_first() {
        let store = TradeStore::new();
        store.insert("sig1:P1".to_string(), 1, trade("sig1", "P1")).await;
        store.insert("sig2:P1".to_string(), 2, trade("sig2", "P1")).await;
        let recent = store.recent("P1", 10).await;
        assert_eq!(recent[0].signature.as_str(), "sig2");
        assert_eq!(recent[1].signature.as_str(), "sig1");
    }

    #[tokio::test]
    async fn caps_ring_at_500() {
        let store = TradeStore::new();
        for i in 0..510 {
            store.insert(format!("sig{i}:P1"), i as u64, trade(&format!("sig{i}"), "P1")).await;
        }
        let recent = store.recent("P1", 1000).await;
        assert_eq!(recent.len(), RING_CAPACITY);
    }

    #[tokio::test]
    async fn dedup_prevents_reinsertion_check() {
        let store = TradeStore::new();
        assert!(!store.has_seen("sig1:P1"));
        store.insert("sig1:P1".to_string(), 1, trade("sig1", "P1")).await;
        assert!(store.has_seen("sig1:P1"));
    }

    #[tokio::test]
    async fn pools_are_independent_rings() {
        let store = TradeStore::new();
        store.insert("sig1:P1".to_string(), 1, trade("sig1", "P1")).await;
        store.insert("sig2:P2".to_string(), 1, trade("sig2", "P2")).await;
        assert_eq!(store.recent("P1", 10).await.len(), 1);
        assert_eq!(store.recent("P2", 10).await.len(), 1);
    }
}
