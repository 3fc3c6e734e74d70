//! HTTP JSON-RPC implementation of [`RpcClient`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use types::{Pubkey, Signature};

use crate::client::{RpcClient, SignaturesPage};
use crate::error::RpcError;
use crate::model::{CompiledInstruction, ConfirmedTransaction, LogFilter, SignatureInfo, TokenBalanceEntry, TransactionMeta};
use crate::ws::LogSubscription;

pub struct HttpRpcClient {
    http: reqwest::Client,
    http_url: String,
    ws_url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// `ws_url` is derived from `http_url` by swapping the scheme unless an
    /// explicit websocket endpoint is supplied.
    pub fn new(http_url: impl Into<String>, ws_url: Option<String>) -> Self {
        let http_url = http_url.into();
        let ws_url = ws_url.unwrap_or_else(|| derive_ws_url(&http_url));
        Self {
            http: reqwest::Client::new(),
            http_url,
            ws_url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: Value = self
            .http
            .post(&self.http_url)
            .json(&body)
            .send()
            .await
            .map_err(|source| RpcError::Transport { method, source })?
            .json()
            .await
            .map_err(|source| RpcError::Transport { method, source })?;

        if let Some(error) = response.get("error") {
            return Err(RpcError::JsonRpc {
                method,
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown rpc error")
                    .to_string(),
            });
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

fn derive_ws_url(http_url: &str) -> String {
    if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http_url.to_string()
    }
}

fn parse_signature_info(v: &Value) -> Option<SignatureInfo> {
    Some(SignatureInfo {
        signature: Signature::new_unchecked(v.get("signature")?.as_str()?),
        slot: v.get("slot")?.as_u64()?,
        block_time: v.get("blockTime").and_then(Value::as_i64),
        err: v.get("err").filter(|e| !e.is_null()).cloned(),
    })
}

fn parse_account_keys(message: &Value, meta: &Value) -> Vec<Pubkey> {
    let mut keys: Vec<Pubkey> = Vec::new();
    let static_keys = message
        .get("accountKeys")
        .or_else(|| message.get("staticAccountKeys"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for k in &static_keys {
        if let Some(s) = k.as_str() {
            keys.push(Pubkey::new_unchecked(s));
        }
    }
    if let Some(loaded) = meta.get("loadedAddresses") {
        for field in ["writable", "readonly"] {
            if let Some(arr) = loaded.get(field).and_then(Value::as_array) {
                for k in arr {
                    if let Some(s) = k.as_str() {
                        keys.push(Pubkey::new_unchecked(s));
                    }
                }
            }
        }
    }
    keys
}

fn parse_token_balances(v: &Value) -> Vec<TokenBalanceEntry> {
    v.as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|b| {
                    Some(TokenBalanceEntry {
                        account_index: b.get("accountIndex")?.as_u64()? as u32,
                        mint: Pubkey::new_unchecked(b.get("mint")?.as_str()?),
                        owner: b.get("owner").and_then(Value::as_str).map(Pubkey::new_unchecked),
                        ui_token_amount_amount: b
                            .get("uiTokenAmount")?
                            .get("amount")?
                            .as_str()?
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_instructions(message: &Value, meta: &Value, keys: &[Pubkey]) -> Vec<CompiledInstruction> {
    let mut out = Vec::new();
    let top_level = message
        .get("instructions")
        .or_else(|| message.get("compiledInstructions"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for ix in &top_level {
        if let Some(compiled) = parse_one_instruction(ix, keys) {
            out.push(compiled);
        }
    }
    if let Some(inner) = meta.get("innerInstructions").and_then(Value::as_array) {
        for group in inner {
            if let Some(ixs) = group.get("instructions").and_then(Value::as_array) {
                for ix in ixs {
                    if let Some(compiled) = parse_one_instruction(ix, keys) {
                        out.push(compiled);
                    }
                }
            }
        }
    }
    out
}

fn parse_one_instruction(ix: &Value, keys: &[Pubkey]) -> Option<CompiledInstruction> {
    let program_idx = ix
        .get("programIdIndex")
        .and_then(Value::as_u64)
        .map(|i| i as usize)?;
    let program_id = keys.get(program_idx)?.clone();
    let data = ix.get("data").and_then(Value::as_str).map(|s| s.to_string());
    // Legacy/json encoding emits base58 instruction data; json-parsed variants
    // that happen to carry a base64 payload are tried too (§4.4 step 3).
    let (data_base58, data_base64) = match &data {
        Some(s) if bs58::decode(s).into_vec().is_ok() => (Some(s.clone()), None),
        Some(s) => (None, Some(s.clone())),
        None => (None, None),
    };
    Some(CompiledInstruction {
        program_id,
        data_base58,
        data_base64,
    })
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        page: SignaturesPage,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let mut opts = json!({ "limit": page.limit.min(1000) });
        if let Some(before) = &page.before {
            opts["before"] = json!(before.as_str());
        }
        let result = self
            .call("getSignaturesForAddress", json!([address.as_str(), opts]))
            .await?;
        Ok(result
            .as_array()
            .map(|arr| arr.iter().filter_map(parse_signature_info).collect())
            .unwrap_or_default())
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<ConfirmedTransaction>, RpcError> {
        let params = json!([
            signature.as_str(),
            { "encoding": "json", "maxSupportedTransactionVersion": 0, "commitment": "confirmed" }
        ]);
        let result = self.call("getTransaction", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        let slot = result.get("slot").and_then(Value::as_u64).unwrap_or_default();
        let block_time = result.get("blockTime").and_then(Value::as_i64);
        let transaction = result.get("transaction").cloned().unwrap_or(Value::Null);
        let message = transaction.get("message").cloned().unwrap_or(Value::Null);
        let meta = result.get("meta").cloned().unwrap_or(Value::Null);
        let account_keys = parse_account_keys(&message, &meta);
        let instructions = parse_instructions(&message, &meta, &account_keys);
        let log_messages = meta
            .get("logMessages")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        Ok(Some(ConfirmedTransaction {
            signature: signature.clone(),
            slot,
            block_time,
            account_keys,
            instructions,
            meta: TransactionMeta {
                log_messages,
                pre_token_balances: parse_token_balances(meta.get("preTokenBalances").unwrap_or(&Value::Null)),
                post_token_balances: parse_token_balances(meta.get("postTokenBalances").unwrap_or(&Value::Null)),
            },
        }))
    }

    async fn get_account_info(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let params = json!([pubkey.as_str(), { "encoding": "base64" }]);
        let result = self.call("getAccountInfo", params).await?;
        Ok(decode_account_value(result.get("value").unwrap_or(&Value::Null)))
    }

    async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, RpcError> {
        let keys: Vec<&str> = pubkeys.iter().map(Pubkey::as_str).collect();
        let params = json!([keys, { "encoding": "base64" }]);
        let result = self.call("getMultipleAccounts", params).await?;
        let values = result
            .get("value")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(values.iter().map(decode_account_value).collect())
    }

    async fn get_program_accounts(&self, program_id: &Pubkey, data_len: usize) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
        let params = json!([
            program_id.as_str(),
            { "encoding": "base64", "filters": [{ "dataSize": data_len }] }
        ]);
        let result = self.call("getProgramAccounts", params).await?;
        Ok(result
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|entry| {
                        let pubkey = Pubkey::new_unchecked(entry.get("pubkey")?.as_str()?);
                        let data = decode_account_value(entry.get("account")?)?;
                        Some((pubkey, data))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        let result = self.call("getSlot", json!([{ "commitment": "confirmed" }])).await?;
        Ok(result.as_u64().unwrap_or_default())
    }

    async fn get_block_time(&self, slot: u64) -> Result<Option<i64>, RpcError> {
        let result = self.call("getBlockTime", json!([slot])).await?;
        Ok(result.as_i64())
    }

    async fn get_block_signatures(&self, slot: u64) -> Result<Option<Vec<Signature>>, RpcError> {
        let params = json!([
            slot,
            { "transactionDetails": "signatures", "commitment": "confirmed", "maxSupportedTransactionVersion": 0 }
        ]);
        let result = self.call("getBlock", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(result.get("signatures").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(Signature::new_unchecked))
                .collect()
        }))
    }

    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogSubscription, RpcError> {
        LogSubscription::connect(&self.ws_url, filter).await
    }
}

fn decode_account_value(value: &Value) -> Option<Vec<u8>> {
    if value.is_null() {
        return None;
    }
    let encoded = value.get("data")?.as_array()?.first()?.as_str()?;
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_scheme_from_https() {
        assert_eq!(derive_ws_url("https://rpc.example.com"), "wss://rpc.example.com");
        assert_eq!(derive_ws_url("http://localhost:8899"), "ws://localhost:8899");
    }

    #[test]
    fn parses_account_keys_with_loaded_addresses() {
        let message = json!({ "staticAccountKeys": ["A", "B"] });
        let meta = json!({ "loadedAddresses": { "writable": ["C"], "readonly": ["D"] } });
        let keys = parse_account_keys(&message, &meta);
        assert_eq!(keys.iter().map(Pubkey::as_str).collect::<Vec<_>>(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn parses_token_balance_amount_from_string() {
        let v = json!([{ "accountIndex": 2, "mint": "M", "uiTokenAmount": { "amount": "12345" } }]);
        let balances = parse_token_balances(&v);
        assert_eq!(balances[0].account_index, 2);
        assert_eq!(balances[0].ui_token_amount_amount, "12345");
    }
}
