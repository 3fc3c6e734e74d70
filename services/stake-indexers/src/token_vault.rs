//! Token-vault stake indexer (§4.8): boot hydration, recovery from the last
//! persisted event's slot, then a live `logsSubscribe` stream mentioning the
//! vault's scan address. One indexer instance owns one vault — the single
//! mutating actor for its shard (§5).

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use metrics::Metrics;
use rpc::{LogFilter, RpcClient, SignaturesPage};
use sqlx::PgPool;
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use types::{AtomsDelta, Pubkey, Signature, TokenVaultStake};

use crate::delta::derive_stake_deltas;
use crate::error::StakeIndexerError;

pub struct TokenVaultIndexer {
    rpc: Arc<dyn RpcClient>,
    db: PgPool,
    stake_program: Pubkey,
    signature_lookback: u32,
    reconnect_backoff: Duration,
    metrics: Arc<Metrics>,
    compaction_interval: Duration,
    safety_window_slots: u64,
}

impl TokenVaultIndexer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: Arc<dyn RpcClient>,
        db: PgPool,
        stake_program: Pubkey,
        signature_lookback: u32,
        reconnect_backoff: Duration,
        metrics: Arc<Metrics>,
        compaction_interval: Duration,
        safety_window_slots: u64,
    ) -> Self {
        Self { rpc, db, stake_program, signature_lookback, reconnect_backoff, metrics, compaction_interval, safety_window_slots }
    }

    /// Hydrates `byOwner` and `seenSignatures` from the persisted snapshot
    /// (§4.8 steps 1-2), then recovers anything missed since the last
    /// persisted event (step 3).
    async fn boot(&self, vault_id: &Pubkey, token_mint: Pubkey, scan_address: Pubkey, decimals: u8) -> Result<TokenVaultStake, StakeIndexerError> {
        let mut stake = TokenVaultStake::new(vault_id.clone(), token_mint.clone(), scan_address.clone(), self.stake_program.clone(), decimals);
        let mut conn = self.db.acquire().await.map_err(persistence::PersistenceError::Database)?;

        for row in persistence::stakes::get_vault_stakes(&mut conn, vault_id.as_str()).await? {
            if let Some(balance) = persistence::numeric::numeric_to_atoms(&row.staked_raw) {
                stake.hydrate_owner(Pubkey::new_unchecked(row.owner), balance);
            }
        }

        let watermark = persistence::stakes::get_last_event_slot(&mut conn, vault_id.as_str()).await?;
        let seen_floor = watermark.map(|s| s as u64).unwrap_or(0);
        for raw in persistence::stakes::get_seen_signatures(&mut conn, vault_id.as_str()).await? {
            stake.mark_seen(Signature::new_unchecked(raw), seen_floor);
        }

        self.recover(&mut stake, &scan_address, &token_mint, watermark).await?;
        Ok(stake)
    }

    async fn recover(&self, stake: &mut TokenVaultStake, scan_address: &Pubkey, token_mint: &Pubkey, watermark: Option<i64>) -> Result<(), StakeIndexerError> {
        let page = SignaturesPage { limit: self.signature_lookback, before: None };
        let signatures = self.rpc.get_signatures_for_address(scan_address, page).await?;

        for info in signatures.iter().rev() {
            if let Some(watermark) = watermark {
                if info.slot as i64 <= watermark {
                    continue;
                }
            }
            if stake.has_seen(&info.signature) {
                continue;
            }
            if let Err(e) = self.apply_signature(stake, scan_address, token_mint, &info.signature).await {
                warn!(vault = %scan_address, signature = %info.signature, error = %e, "failed to recover stake transaction");
            }
        }
        Ok(())
    }

    /// Fetches and applies a single signature's stake deltas, subject to the
    /// dedup set and a program-touch check. No-op if the tx no longer
    /// exists, isn't found, or never touches the stake program.
    async fn apply_signature(&self, stake: &mut TokenVaultStake, scan_address: &Pubkey, token_mint: &Pubkey, signature: &Signature) -> Result<(), StakeIndexerError> {
        if stake.has_seen(signature) {
            return Ok(());
        }

        let Some(tx) = self.rpc.get_transaction(signature).await? else {
            return Ok(());
        };

        let touches_program = tx.instructions.iter().any(|ix| ix.program_id == self.stake_program) || tx.meta.log_messages.iter().any(|l| l.contains(self.stake_program.as_str()));
        if !touches_program {
            stake.mark_seen(signature.clone(), tx.slot);
            return Ok(());
        }

        let deltas = derive_stake_deltas(&tx, token_mint);
        if deltas.is_empty() {
            stake.mark_seen(signature.clone(), tx.slot);
            return Ok(());
        }

        let mut conn = self.db.acquire().await.map_err(persistence::PersistenceError::Database)?;
        for (owner, delta) in &deltas {
            let staked_change = delta.negate();
            stake.apply_delta(owner.clone(), &staked_change);
            let balance_after = stake.balance_of(owner);

            let event = persistence::stakes::StakeEventInsert {
                vault_id: scan_address.to_string(),
                signature: signature.to_string(),
                owner: owner.to_string(),
                slot: tx.slot as i64,
                delta_raw: signed_numeric(&staked_change),
                balance_after_raw: persistence::numeric::atoms_to_numeric(&balance_after),
            };
            persistence::stakes::insert_stake_event(&mut conn, &event).await?;

            if balance_after.is_zero() {
                persistence::stakes::delete_owner_stake(&mut conn, scan_address.as_str(), owner.as_str()).await?;
            } else {
                persistence::stakes::upsert_owner_stake(&mut conn, scan_address.as_str(), owner.as_str(), &persistence::numeric::atoms_to_numeric(&balance_after)).await?;
            }
        }

        persistence::stakes::update_vault_totals(&mut conn, scan_address.as_str(), stake.holders() as i64, &persistence::numeric::atoms_to_numeric(&stake.total())).await?;
        stake.mark_seen(signature.clone(), tx.slot);
        debug!(vault = %scan_address, signature = %signature, owners = deltas.len(), "applied stake deltas");
        Ok(())
    }

    /// Runs boot + recovery, then the live subscription loop until `token`
    /// is cancelled.
    pub async fn run(self, vault_id: Pubkey, token_mint: Pubkey, scan_address: Pubkey, decimals: u8, token: CancellationToken) -> Result<(), StakeIndexerError> {
        let mut stake = self.boot(&vault_id, token_mint.clone(), scan_address.clone(), decimals).await?;
        info!(vault = %vault_id, holders = stake.holders(), "stake indexer boot complete");
        let mut compaction = interval(self.compaction_interval);

        loop {
            if token.is_cancelled() {
                return Ok(());
            }

            let mut subscription = match self.rpc.subscribe_logs(LogFilter::Mentions(vec![scan_address.clone()])).await {
                Ok(sub) => sub,
                Err(e) => {
                    self.metrics.record_rpc_retry();
                    error!(vault = %vault_id, error = %e, "stake log subscription failed to connect, retrying");
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
                    _ = compaction.tick() => {
                        self.compact(&vault_id, &mut stake).await;
                    }
                    notification = subscription.next() => {
                        let Some(notification) = notification else {
                            self.metrics.record_rpc_retry();
                            warn!(vault = %vault_id, "stake log subscription stream closed, reconnecting");
                            break;
                        };
                        if let Err(e) = self.apply_signature(&mut stake, &scan_address, &token_mint, &notification.signature).await {
                            warn!(vault = %vault_id, signature = %notification.signature, error = %e, "failed to process stake signature");
                        }
                    }
                }
            }

            sleep(self.reconnect_backoff).await;
        }
    }

    /// Discards `seenSignatures` entries older than `chainHead -
    /// safetyWindow` (§9 Design Notes) so a long-lived process doesn't hold
    /// every signature it has ever seen.
    async fn compact(&self, vault_id: &Pubkey, stake: &mut TokenVaultStake) {
        let slot = match self.rpc.get_slot().await {
            Ok(slot) => slot,
            Err(e) => {
                warn!(vault = %vault_id, error = %e, "failed to fetch current slot for dedup compaction");
                return;
            }
        };
        let below = slot.saturating_sub(self.safety_window_slots);
        stake.compact_seen_before(below);
    }
}

fn signed_numeric(delta: &AtomsDelta) -> BigDecimal {
    let magnitude = persistence::numeric::atoms_to_numeric(&delta.magnitude());
    if delta.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rpc::{ConfirmedTransaction, LogFilter as RpcLogFilter, LogSubscription, RpcError, SignatureInfo, SignaturesPage};

    struct FakeRpc {
        slot: u64,
    }

    #[async_trait]
    impl RpcClient for FakeRpc {
        async fn get_signatures_for_address(&self, _address: &Pubkey, _page: SignaturesPage) -> Result<Vec<SignatureInfo>, RpcError> {
            Ok(Vec::new())
        }
        async fn get_transaction(&self, _signature: &Signature) -> Result<Option<ConfirmedTransaction>, RpcError> {
            Ok(None)
        }
        async fn get_account_info(&self, _pubkey: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
            Ok(None)
        }
        async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, RpcError> {
            Ok(pubkeys.iter().map(|_| None).collect())
        }
        async fn get_program_accounts(&self, _program_id: &Pubkey, _data_len: usize) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
            Ok(Vec::new())
        }
        async fn get_slot(&self) -> Result<u64, RpcError> {
            Ok(self.slot)
        }
        async fn get_block_time(&self, _slot: u64) -> Result<Option<i64>, RpcError> {
            Ok(None)
        }
        async fn get_block_signatures(&self, _slot: u64) -> Result<Option<Vec<Signature>>, RpcError> {
            Ok(None)
        }
        async fn subscribe_logs(&self, _filter: RpcLogFilter) -> Result<LogSubscription, RpcError> {
            Err(RpcError::SubscriptionClosed)
        }
    }

    fn indexer(slot: u64) -> TokenVaultIndexer {
        TokenVaultIndexer::new(
            Arc::new(FakeRpc { slot }),
            PgPool::connect_lazy("postgres://localhost/test").unwrap(),
            Pubkey::new_unchecked("stake-program"),
            200,
            Duration::from_millis(1),
            Arc::new(Metrics::new()),
            Duration::from_secs(60),
            1_500,
        )
    }

    #[tokio::test]
    async fn compact_drops_entries_below_the_safety_window() {
        let indexer = indexer(10_000);
        let mut stake = TokenVaultStake::new(
            Pubkey::new_unchecked("vault"),
            Pubkey::new_unchecked("mint"),
            Pubkey::new_unchecked("vault"),
            Pubkey::new_unchecked("stake-program"),
            6,
        );
        stake.mark_seen(Signature::new_unchecked("old"), 100);
        stake.mark_seen(Signature::new_unchecked("recent"), 9_000);

        indexer.compact(&Pubkey::new_unchecked("vault"), &mut stake).await;

        assert!(!stake.has_seen(&Signature::new_unchecked("old")));
        assert!(stake.has_seen(&Signature::new_unchecked("recent")));
    }
}
