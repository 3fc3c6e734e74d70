//! Cached pool-account reader (C4): `read_pool(poolId) -> PoolView` with a
//! 10-15s per-pool TTL. The first caller to miss issues the read; others
//! that arrive mid-read may repeat the work, which is acceptable given the
//! short TTL and rare misses (§5 resource policy).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;
use types::{Pool, Pubkey};

use crate::error::PoolReaderError;
use crate::layout::{build_pool, parse_mint_decimals, parse_pool_account};

struct CacheEntry {
    pool: Pool,
    fetched_at: Instant,
}

struct DecimalsEntry {
    decimals: u8,
    fetched_at: Instant,
}

pub struct PoolReader {
    rpc: Arc<dyn rpc::RpcClient>,
    cache: DashMap<String, CacheEntry>,
    mint_decimals: DashMap<String, DecimalsEntry>,
    ttl: Duration,
}

impl PoolReader {
    pub fn new(rpc: Arc<dyn rpc::RpcClient>, ttl: Duration) -> Self {
        Self { rpc, cache: DashMap::new(), mint_decimals: DashMap::new(), ttl }
    }

    /// Reads `pool_id`'s account, reusing a cached value younger than `ttl`.
    /// On RPC failure the caller should treat this as "retry later" and
    /// must NOT mark any in-flight signature as processed (§4.3).
    pub async fn read_pool(&self, pool_id: &Pubkey) -> Result<Pool, PoolReaderError> {
        if let Some(entry) = self.cache.get(pool_id.as_str()) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.pool.clone());
            }
        }

        let slot = self.rpc.get_slot().await.map_err(|source| PoolReaderError::Rpc { pool_id: pool_id.to_string(), source })?;

        let data = self
            .rpc
            .get_account_info(pool_id)
            .await
            .map_err(|source| PoolReaderError::Rpc { pool_id: pool_id.to_string(), source })?
            .ok_or_else(|| PoolReaderError::AccountNotFound { pool_id: pool_id.to_string() })?;

        let parsed = parse_pool_account(&data).map_err(|reason| PoolReaderError::MalformedAccount { pool_id: pool_id.to_string(), reason })?;

        let base_decimals = self.decimals_of(&parsed.base_mint).await?;
        let quote_decimals = self.decimals_of(&parsed.quote_mint).await?;

        let pool = build_pool(pool_id.clone(), parsed, base_decimals, quote_decimals, slot)
            .map_err(|source| PoolReaderError::Invariant { pool_id: pool_id.to_string(), source })?;

        self.cache.insert(pool_id.to_string(), CacheEntry { pool: pool.clone(), fetched_at: Instant::now() });
        Ok(pool)
    }

    async fn decimals_of(&self, mint: &Pubkey) -> Result<u8, PoolReaderError> {
        if let Some(entry) = self.mint_decimals.get(mint.as_str()) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.decimals);
            }
        }

        let data = self
            .rpc
            .get_account_info(mint)
            .await
            .map_err(|source| PoolReaderError::Rpc { pool_id: mint.to_string(), source })?
            .ok_or_else(|| PoolReaderError::AccountNotFound { pool_id: mint.to_string() })?;

        let decimals = parse_mint_decimals(&data).ok_or(PoolReaderError::MalformedAccount { pool_id: mint.to_string(), reason: "mint account too short" })?;

        self.mint_decimals.insert(mint.to_string(), DecimalsEntry { decimals, fetched_at: Instant::now() });
        Ok(decimals)
    }

    /// Batch-resolves decimals for several mints in one round trip, for
    /// pool discovery sweeps that need many mints at once.
    pub async fn batch_decimals(&self, mints: &[Pubkey]) -> Result<Vec<Option<u8>>, PoolReaderError> {
        let uncached: Vec<Pubkey> = mints
            .iter()
            .filter(|m| !matches!(self.mint_decimals.get(m.as_str()), Some(e) if e.fetched_at.elapsed() < self.ttl))
            .cloned()
            .collect();

        if !uncached.is_empty() {
            let accounts = self
                .rpc
                .get_multiple_accounts(&uncached)
                .await
                .map_err(|source| PoolReaderError::Rpc { pool_id: "batch".to_string(), source })?;

            for (mint, account) in uncached.iter().zip(accounts) {
                match account.and_then(|data| parse_mint_decimals(&data)) {
                    Some(decimals) => {
                        self.mint_decimals.insert(mint.to_string(), DecimalsEntry { decimals, fetched_at: Instant::now() });
                    }
                    None => warn!(mint = %mint, "failed to resolve mint decimals in batch read"),
                }
            }
        }

        Ok(mints.iter().map(|m| self.mint_decimals.get(m.as_str()).map(|e| e.decimals)).collect())
    }

    pub fn evict(&self, pool_id: &Pubkey) {
        self.cache.remove(pool_id.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rpc::{ConfirmedTransaction, LogFilter, LogSubscription, RpcClient, RpcError, SignaturesPage, SignatureInfo};
    use types::Signature;

    struct FakeRpc {
        pool_account: Vec<u8>,
        mint_account: Vec<u8>,
    }

    #[async_trait]
    impl RpcClient for FakeRpc {
        async fn get_signatures_for_address(&self, _address: &Pubkey, _page: SignaturesPage) -> Result<Vec<SignatureInfo>, RpcError> {
            Ok(Vec::new())
        }
        async fn get_transaction(&self, _signature: &Signature) -> Result<Option<ConfirmedTransaction>, RpcError> {
            Ok(None)
        }
        async fn get_account_info(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
            if pubkey.as_str() == "pool" {
                Ok(Some(self.pool_account.clone()))
            } else {
                Ok(Some(self.mint_account.clone()))
            }
        }
        async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, RpcError> {
            Ok(pubkeys.iter().map(|_| Some(self.mint_account.clone())).collect())
        }
        async fn get_program_accounts(&self, _program_id: &Pubkey, _data_len: usize) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
            Ok(Vec::new())
        }
        async fn get_slot(&self) -> Result<u64, RpcError> {
            Ok(42)
        }
        async fn get_block_time(&self, _slot: u64) -> Result<Option<i64>, RpcError> {
            Ok(None)
        }
        async fn get_block_signatures(&self, _slot: u64) -> Result<Option<Vec<Signature>>, RpcError> {
            Ok(None)
        }
        async fn subscribe_logs(&self, _filter: LogFilter) -> Result<LogSubscription, RpcError> {
            Err(RpcError::SubscriptionClosed)
        }
    }

    fn sample_pool_blob() -> Vec<u8> {
        crate::layout::sample_blob()
    }

    fn sample_mint_blob() -> Vec<u8> {
        let mut data = vec![0u8; 82];
        data[44] = 9;
        data
    }

    #[tokio::test]
    async fn reads_and_caches_pool() {
        let rpc = Arc::new(FakeRpc { pool_account: sample_pool_blob(), mint_account: sample_mint_blob() });
        let reader = PoolReader::new(rpc, Duration::from_secs(10));
        let pool_id = Pubkey::new_unchecked("pool");

        let pool = reader.read_pool(&pool_id).await.unwrap();
        assert_eq!(pool.base_decimals, 9);
        assert_eq!(pool.bin_step_bps, 10);

        // Second read should hit cache rather than error from a bogus mint probe.
        let pool2 = reader.read_pool(&pool_id).await.unwrap();
        assert_eq!(pool2.pool_id, pool.pool_id);
    }
}
