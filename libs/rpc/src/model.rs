//! Wire-shaped mirrors of the upstream RPC's response bodies (§6 upstream).
//! These are intentionally close to the raw JSON so the HTTP client can
//! `serde_json::from_value` straight into them; callers further up the
//! stack (Trade Deriver, Ingestion Engine) work against these types
//! directly rather than a re-decoded domain model.

use serde::{Deserialize, Serialize};
use types::{Pubkey, Signature};

/// One entry from `getSignaturesForAddress`, newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    /// Non-null when the transaction failed on-chain; still a valid,
    /// confirmed signature for dedup/bookkeeping purposes.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

/// A `meta.preTokenBalances` / `meta.postTokenBalances` entry. The integer
/// atoms come only from `ui_token_amount_amount` (§6), never from
/// `ui_amount` floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalanceEntry {
    pub account_index: u32,
    pub mint: Pubkey,
    #[serde(default)]
    pub owner: Option<Pubkey>,
    pub ui_token_amount_amount: String,
}

/// A single top-level or CPI instruction as exposed by the transaction's
/// `instructions`/`compiledInstructions` projection, with its target program
/// resolved against the flattened account-key list.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id: Pubkey,
    /// Raw instruction data, base58-encoded (legacy encoding).
    pub data_base58: Option<String>,
    /// Raw instruction data, base64-encoded (jsonParsed/json encodings).
    pub data_base64: Option<String>,
}

/// `meta` projection of a confirmed transaction.
#[derive(Debug, Clone)]
pub struct TransactionMeta {
    pub log_messages: Vec<String>,
    pub pre_token_balances: Vec<TokenBalanceEntry>,
    pub post_token_balances: Vec<TokenBalanceEntry>,
}

/// A fetched, confirmed transaction. `account_keys` is already the flattened
/// `staticAccountKeys + loadedAddresses.{writable,readonly}` list (§4.2 step
/// 1: vault lookup must see address-lookup-table-loaded keys too).
#[derive(Debug, Clone)]
pub struct ConfirmedTransaction {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<CompiledInstruction>,
    pub meta: TransactionMeta,
}

impl ConfirmedTransaction {
    /// The transaction's fee payer — always account index 0 (§4.2 step 4).
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    pub fn account_index(&self, key: &Pubkey) -> Option<usize> {
        self.account_keys.iter().position(|k| k == key)
    }
}

/// A single `logsNotification` delivered over the subscribed websocket.
#[derive(Debug, Clone)]
pub struct LogNotification {
    pub signature: Signature,
    pub slot: u64,
    pub logs: Vec<String>,
    pub err: Option<serde_json::Value>,
}

/// What a log subscription mentions: either a set of addresses (e.g. a
/// stake vault's `scanAddress`) or a whole program id.
#[derive(Debug, Clone)]
pub enum LogFilter {
    Mentions(Vec<Pubkey>),
    Program(Pubkey),
}
