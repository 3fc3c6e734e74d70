//! Event record: the canonical, append-only persisted event log (C11).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::{Pubkey, Signature};

/// A decoded program-log event, `{name, data}` (C2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub name: String,
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Unique key: `(programId, slot, txnIndex, eventIndex)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub program_id: Pubkey,
    pub slot: u64,
    pub txn_index: u32,
    pub event_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub key: EventKey,
    pub signature: Signature,
    pub block_time: i64,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub logs: Vec<String>,
}

impl EventRecord {
    /// The §9 raw-fallback row for an undecodable transaction: `eventType =
    /// "tx"`, payload carries nothing but the raw logs.
    pub fn raw_fallback(
        program_id: Pubkey,
        slot: u64,
        txn_index: u32,
        signature: Signature,
        block_time: i64,
        logs: Vec<String>,
    ) -> Self {
        Self {
            key: EventKey {
                program_id,
                slot,
                txn_index,
                event_index: 0,
            },
            signature,
            block_time,
            event_type: "tx".to_string(),
            event_data: serde_json::Value::Null,
            logs,
        }
    }
}
