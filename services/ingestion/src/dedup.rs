//! `(signature, poolId)` dedup set (§3, §8 property 1) with slot-watermarked
//! compaction (§9 Design Notes): the naive "grow forever" set is replaced
//! with a parallel `key -> slot` map so old entries can be discarded once
//! their slot falls behind `chainHead - safetyWindow`.

use dashmap::DashMap;

pub struct DedupSet {
    seen: DashMap<String, u64>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self { seen: DashMap::new() }
    }

    pub fn has_seen(&self, key: &str) -> bool {
        self.seen.contains_key(key)
    }

    /// Marks `key` seen at `slot`. Never called on a transient failure path
    /// (§4.4, §9) — only after a signature's processing has actually
    /// completed, successfully or as a confirmed non-swap.
    pub fn mark_seen(&self, key: String, slot: u64) {
        self.seen.insert(key, slot);
    }

    /// Discards entries whose slot is strictly less than `below_slot`.
    pub fn compact(&self, below_slot: u64) {
        self.seen.retain(|_, slot| *slot >= below_slot);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_and_checks_seen() {
        let set = DedupSet::new();
        assert!(!set.has_seen("sig1:pool1"));
        set.mark_seen("sig1:pool1".to_string(), 100);
        assert!(set.has_seen("sig1:pool1"));
    }

    #[test]
    fn compaction_drops_only_old_slots() {
        let set = DedupSet::new();
        set.mark_seen("a".to_string(), 10);
        set.mark_seen("b".to_string(), 200);
        set.compact(100);
        assert!(!set.has_seen("a"));
        assert!(set.has_seen("b"));
    }
}
