//! NFT stake indexer (§4.8): simpler than the token-vault indexer — no
//! recovery pass, no persisted event ledger. Derives stake/unstake purely
//! from the decoded `{NftStaked, NftUnstaked}` events and keeps one row per
//! `(nftMint, owner)`. Idempotent upserts make in-process dedup a
//! best-effort optimization rather than a correctness requirement.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::Metrics;
use rpc::{LogFilter, LogNotification, RpcClient};
use sqlx::PgPool;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use types::{NftStakeStatus, Pubkey, Signature};

use crate::error::StakeIndexerError;

pub struct NftStakeIndexer {
    rpc: Arc<dyn RpcClient>,
    db: PgPool,
    stake_program: Pubkey,
    reconnect_backoff: Duration,
    metrics: Arc<Metrics>,
}

impl NftStakeIndexer {
    pub fn new(rpc: Arc<dyn RpcClient>, db: PgPool, stake_program: Pubkey, reconnect_backoff: Duration, metrics: Arc<Metrics>) -> Self {
        Self { rpc, db, stake_program, reconnect_backoff, metrics }
    }

    pub async fn run(self, token: CancellationToken) -> Result<(), StakeIndexerError> {
        let mut seen: HashSet<Signature> = HashSet::new();

        loop {
            if token.is_cancelled() {
                return Ok(());
            }

            let mut subscription = match self.rpc.subscribe_logs(LogFilter::Program(self.stake_program.clone())).await {
                Ok(sub) => sub,
                Err(e) => {
                    self.metrics.record_rpc_retry();
                    error!(error = %e, "nft stake log subscription failed to connect, retrying");
                    sleep(self.reconnect_backoff).await;
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        subscription.unsubscribe();
                        return Ok(());
                    }
                    notification = subscription.next() => {
                        let Some(notification) = notification else {
                            self.metrics.record_rpc_retry();
                            warn!("nft stake log subscription stream closed, reconnecting");
                            break;
                        };
                        if !seen.insert(notification.signature.clone()) {
                            continue;
                        }
                        if let Err(e) = self.apply(&notification).await {
                            warn!(signature = %notification.signature, error = %e, "failed to apply nft stake event");
                        }
                    }
                }
            }

            sleep(self.reconnect_backoff).await;
        }
    }

    async fn apply(&self, notification: &LogNotification) -> Result<(), StakeIndexerError> {
        let events = codec::decode_logs(&notification.logs);
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.db.acquire().await.map_err(persistence::PersistenceError::Database)?;
        for event in events {
            match event.name.as_str() {
                "NftStaked" => {
                    let Some(nft_mint) = field_pubkey(&event.data, "nft_mint") else { continue };
                    let Some(owner) = field_pubkey(&event.data, "owner") else { continue };
                    let lock_duration_sec = field_i64(&event.data, "lock_duration_sec").unwrap_or(0);
                    let block_time = self.rpc.get_block_time(notification.slot).await.ok().flatten().unwrap_or_else(now_unix_sec);
                    let unlock_at_sec = block_time + lock_duration_sec;

                    // The event carries no PDA/pool linkage; the owner's own
                    // key is the closest stand-in this data supports.
                    persistence::nft_stakes::upsert_nft_stake(
                        &mut conn,
                        nft_mint.as_str(),
                        owner.as_str(),
                        owner.as_str(),
                        lock_duration_sec,
                        unlock_at_sec,
                        NftStakeStatus::Active,
                        None,
                    )
                    .await?;
                }
                "NftUnstaked" => {
                    let Some(nft_mint) = field_pubkey(&event.data, "nft_mint") else { continue };
                    let Some(owner) = field_pubkey(&event.data, "owner") else { continue };
                    persistence::nft_stakes::mark_withdrawn(&mut conn, nft_mint.as_str(), owner.as_str()).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn field_pubkey(data: &std::collections::BTreeMap<String, serde_json::Value>, key: &str) -> Option<Pubkey> {
    data.get(key)?.as_str().map(Pubkey::new_unchecked)
}

fn field_i64(data: &std::collections::BTreeMap<String, serde_json::Value>, key: &str) -> Option<i64> {
    data.get(key)?.as_i64()
}

fn now_unix_sec() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_pubkey_reads_string() {
        let mut data = std::collections::BTreeMap::new();
        data.insert("owner".to_string(), json!("owner1"));
        assert_eq!(field_pubkey(&data, "owner"), Some(Pubkey::new_unchecked("owner1")));
    }

    #[test]
    fn field_pubkey_missing_key_is_none() {
        let data = std::collections::BTreeMap::new();
        assert_eq!(field_pubkey(&data, "owner"), None);
    }

    #[test]
    fn field_i64_reads_number() {
        let mut data = std::collections::BTreeMap::new();
        data.insert("lock_duration_sec".to_string(), json!(86_400));
        assert_eq!(field_i64(&data, "lock_duration_sec"), Some(86_400));
    }
}
