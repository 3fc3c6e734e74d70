//! Fee-Vault Refresher (C9): a debounced, rate-limited reader of the three
//! fee-vault token accounts, triggered by trades and gated by a trailing
//! `debounceMs` plus a `minIntervalMs` floor so burst traffic collapses into
//! one refresh.

use std::time::{Duration, Instant};

use pool_reader::PoolReader;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use types::{Atoms, Pool, Trade};

use crate::error::AggregatorError;

/// SPL Token account layout: `mint` at byte 0 (32 bytes), `amount` at byte
/// 64 (8-byte little-endian u64). Fixed by the token program, not this
/// indexer.
const TOKEN_ACCOUNT_MINT_OFFSET: usize = 0;
const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;
const TOKEN_ACCOUNT_MIN_LEN: usize = 72;

fn parse_token_account(data: &[u8]) -> Option<(types::Pubkey, Atoms)> {
    if data.len() < TOKEN_ACCOUNT_MIN_LEN {
        return None;
    }
    let mint_bytes: [u8; 32] = data[TOKEN_ACCOUNT_MINT_OFFSET..TOKEN_ACCOUNT_MINT_OFFSET + 32].try_into().ok()?;
    let amount_bytes: [u8; 8] = data[TOKEN_ACCOUNT_AMOUNT_OFFSET..TOKEN_ACCOUNT_AMOUNT_OFFSET + 8].try_into().ok()?;
    let amount = u64::from_le_bytes(amount_bytes);
    Some((types::Pubkey::from_bytes(&mint_bytes), Atoms::from_biguint(num_bigint::BigUint::from(amount))))
}

pub struct FeeVaultRefresher {
    pool: Pool,
    rpc: Arc<dyn rpc::RpcClient>,
    pool_reader: Arc<PoolReader>,
    db: PgPool,
    debounce: Duration,
    min_interval: Duration,
}

impl FeeVaultRefresher {
    pub fn new(pool: Pool, rpc: Arc<dyn rpc::RpcClient>, pool_reader: Arc<PoolReader>, db: PgPool, debounce: Duration, min_interval: Duration) -> Self {
        Self { pool, rpc, pool_reader, db, debounce, min_interval }
    }

    pub async fn run(self, mut trades: broadcast::Receiver<Trade>, token: CancellationToken) {
        let mut last_refresh: Option<Instant> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            let sleep_until_deadline = async {
                match deadline {
                    Some(d) => sleep_until(d.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = token.cancelled() => return,
                trade = trades.recv() => {
                    match trade {
                        Ok(trade) if trade.pool_id == self.pool.pool_id => {
                            deadline = Some(self.next_deadline(last_refresh, deadline));
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(pool = %self.pool.pool_id, skipped, "fee-vault refresher lagged behind trade broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
                _ = sleep_until_deadline => {
                    if let Err(e) = self.refresh().await {
                        error!(pool = %self.pool.pool_id, error = %e, "fee-vault refresh failed");
                    }
                    last_refresh = Some(Instant::now());
                    deadline = None;
                }
            }
        }
    }

    /// §4.6's debounce/min-interval state machine, evaluated on each new
    /// trade. Every trade cancels and reschedules any pending timer to
    /// `now + debounce` — a trailing debounce, not a leading one — clamped
    /// to the min-interval floor only when that floor lands later.
    fn next_deadline(&self, last_refresh: Option<Instant>, pending: Option<Instant>) -> Instant {
        let now = Instant::now();
        let floor = last_refresh.map(|t| t + self.min_interval);

        if let Some(floor) = floor {
            if now < floor {
                return pending.map(|p| p.max(floor)).unwrap_or(floor);
            }
        }

        now + self.debounce
    }

    async fn refresh(&self) -> Result<(), AggregatorError> {
        let vaults = [self.pool.creator_fee_vault.clone(), self.pool.holders_fee_vault.clone(), self.pool.nft_fee_vault.clone()];
        let accounts = self.rpc.get_multiple_accounts(&vaults).await?;

        let mut parsed = Vec::with_capacity(3);
        for (vault, account) in vaults.iter().zip(accounts) {
            match account.and_then(|data| parse_token_account(&data)) {
                Some(pair) => parsed.push(pair),
                None => {
                    warn!(pool = %self.pool.pool_id, vault = %vault, "fee vault account missing or malformed, skipping refresh");
                    return Ok(());
                }
            }
        }

        let mints: Vec<types::Pubkey> = parsed.iter().map(|(mint, _)| mint.clone()).collect();
        let decimals = self.pool_reader.batch_decimals(&mints).await?;

        let mut ui_values = Vec::with_capacity(3);
        for ((_, atoms), decimals) in parsed.iter().zip(decimals) {
            let Some(decimals) = decimals else {
                warn!(pool = %self.pool.pool_id, "could not resolve a fee mint's decimals, skipping refresh");
                return Ok(());
            };
            let Some(ui) = atoms.to_ui_decimal(decimals) else {
                warn!(pool = %self.pool.pool_id, "fee amount overflowed Decimal conversion, skipping refresh");
                return Ok(());
            };
            ui_values.push(ui);
        }

        let mut conn = self.db.acquire().await.map_err(persistence::PersistenceError::Database)?;
        persistence::pools::update_fee_ui(
            &mut conn,
            self.pool.pool_id.as_str(),
            persistence::numeric::decimal_to_numeric(ui_values[0]),
            persistence::numeric::decimal_to_numeric(ui_values[1]),
            persistence::numeric::decimal_to_numeric(ui_values[2]),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mint_and_amount() {
        let mut data = vec![0u8; 165];
        data[0..32].copy_from_slice(&[7u8; 32]);
        data[64..72].copy_from_slice(&42u64.to_le_bytes());
        let (mint, amount) = parse_token_account(&data).unwrap();
        assert_eq!(mint.to_bytes(), [7u8; 32]);
        assert_eq!(amount.to_string(), "42");
    }

    #[test]
    fn short_account_is_rejected() {
        assert!(parse_token_account(&[0u8; 10]).is_none());
    }

    fn refresher() -> FeeVaultRefresher {
        FeeVaultRefresher::new(
            test_pool(),
            Arc::new(unimplemented_rpc()),
            Arc::new(PoolReader::new(Arc::new(unimplemented_rpc()), Duration::from_secs(10))),
            sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap(),
            Duration::from_millis(500),
            Duration::from_millis(1000),
        )
    }

    fn test_pool() -> Pool {
        Pool {
            pool_id: types::Pubkey::new_unchecked("Pool1"),
            base_mint: types::Pubkey::new_unchecked("AAAA"),
            quote_mint: types::Pubkey::new_unchecked("BBBB"),
            base_decimals: 9,
            quote_decimals: 6,
            base_vault: types::Pubkey::new_unchecked("VaultA"),
            quote_vault: types::Pubkey::new_unchecked("VaultB"),
            lp_mint: None,
            creator_fee_vault: types::Pubkey::new_unchecked("FeeC"),
            holders_fee_vault: types::Pubkey::new_unchecked("FeeH"),
            nft_fee_vault: types::Pubkey::new_unchecked("FeeN"),
            bin_step_bps: 10,
            active_bin: 0,
            price_q64_64: types::Q64_64::ZERO,
            last_update_slot: 0,
        }
    }

    fn unimplemented_rpc() -> impl rpc::RpcClient {
        struct Unimplemented;
        #[async_trait::async_trait]
        impl rpc::RpcClient for Unimplemented {
            async fn get_signatures_for_address(&self, _a: &types::Pubkey, _p: rpc::SignaturesPage) -> Result<Vec<rpc::SignatureInfo>, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_transaction(&self, _s: &types::Signature) -> Result<Option<rpc::ConfirmedTransaction>, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_account_info(&self, _p: &types::Pubkey) -> Result<Option<Vec<u8>>, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_multiple_accounts(&self, _p: &[types::Pubkey]) -> Result<Vec<Option<Vec<u8>>>, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_program_accounts(&self, _p: &types::Pubkey, _l: usize) -> Result<Vec<(types::Pubkey, Vec<u8>)>, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_slot(&self) -> Result<u64, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_block_time(&self, _s: u64) -> Result<Option<i64>, rpc::RpcError> {
                unimplemented!()
            }
            async fn get_block_signatures(&self, _s: u64) -> Result<Option<Vec<types::Signature>>, rpc::RpcError> {
                unimplemented!()
            }
            async fn subscribe_logs(&self, _f: rpc::LogFilter) -> Result<rpc::LogSubscription, rpc::RpcError> {
                unimplemented!()
            }
        }
        Unimplemented
    }

    /// S6: three trades within 200ms each reschedule the timer to
    /// `now + debounce`, so the refresh lands ~500ms after the last trade,
    /// not the first.
    #[test]
    fn burst_trades_reschedule_to_the_last_trade_plus_debounce() {
        let refresher = refresher();
        let d1 = refresher.next_deadline(None, None);
        std::thread::sleep(Duration::from_millis(50));
        let d2 = refresher.next_deadline(None, Some(d1));
        std::thread::sleep(Duration::from_millis(50));
        let d3 = refresher.next_deadline(None, Some(d2));

        assert!(d3 > d2);
        assert!(d2 > d1);
        let now = Instant::now();
        assert!(d3 >= now + Duration::from_millis(490));
        assert!(d3 <= now + Duration::from_millis(520));
    }

    #[test]
    fn floor_wins_over_debounce_when_it_lands_later() {
        let refresher = refresher();
        let last_refresh = Some(Instant::now());
        let deadline = refresher.next_deadline(last_refresh, None);
        assert!(deadline >= last_refresh.unwrap() + Duration::from_millis(1000));
    }
}
