//! The Ingestion Engine (C5) — `processSignatureForPool`, the single
//! per-pool processing function all three entry points funnel into (§4.4).

use std::sync::Arc;
use std::time::{Duration, Instant};

use codec::{decode_logs, is_swap_transaction, RawInstruction};
use dashmap::DashMap;
use metrics::Metrics;
use pool_reader::PoolReader;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use types::{DecodedEvent, EventRecord, Pool, Pubkey, Signature, Trade};

use crate::error::IngestionError;
use crate::trade_store::TradeStore;

/// Identifies the venue-specific instruction name and log markers the swap
/// classifier (§4.4 step with codec's `is_swap_transaction`) looks for.
#[derive(Debug, Clone)]
pub struct SwapClassifierConfig {
    pub swap_instruction_name: String,
    pub extra_log_markers: Vec<String>,
}

impl Default for SwapClassifierConfig {
    fn default() -> Self {
        Self { swap_instruction_name: "swap".to_string(), extra_log_markers: Vec::new() }
    }
}

pub struct IngestionEngine {
    rpc: Arc<dyn rpc::RpcClient>,
    pool_reader: Arc<PoolReader>,
    db: PgPool,
    trade_store: Arc<TradeStore>,
    program_id: Pubkey,
    classifier: SwapClassifierConfig,
    persist_raw_fallback: bool,
    trade_notify: broadcast::Sender<Trade>,
    event_notify: broadcast::Sender<EventRecord>,
    metrics: Arc<Metrics>,
    block_signatures: DashMap<u64, (Instant, Arc<Vec<Signature>>)>,
}

/// `txnIndex` resolution caches a slot's signature order for this long
/// before re-fetching the block (§4.7).
const BLOCK_SIGNATURES_CACHE_TTL: Duration = Duration::from_secs(60);

impl IngestionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: Arc<dyn rpc::RpcClient>,
        pool_reader: Arc<PoolReader>,
        db: PgPool,
        trade_store: Arc<TradeStore>,
        program_id: Pubkey,
        classifier: SwapClassifierConfig,
        persist_raw_fallback: bool,
        trade_notify: broadcast::Sender<Trade>,
        event_notify: broadcast::Sender<EventRecord>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            rpc,
            pool_reader,
            db,
            trade_store,
            program_id,
            classifier,
            persist_raw_fallback,
            trade_notify,
            event_notify,
            metrics,
            block_signatures: DashMap::new(),
        }
    }

    pub fn trade_store(&self) -> Arc<TradeStore> {
        self.trade_store.clone()
    }

    /// A fresh receiver for every trade this engine derives, fanned out to
    /// the candle/volume aggregators, the fee-vault refresher and the WS
    /// hub. Each downstream consumer holds its own receiver so a slow one
    /// cannot stall the others (late subscribers miss trades sent before
    /// they subscribed — acceptable since each has already been persisted).
    pub fn subscribe_trades(&self) -> broadcast::Receiver<Trade> {
        self.trade_notify.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EventRecord> {
        self.event_notify.subscribe()
    }

    /// §4.4's one true processing function. Every entry point (live poll,
    /// log subscription, backfill) calls this and only this per signature.
    pub async fn process_signature_for_pool(&self, pool_id: &Pubkey, signature: &Signature) -> Result<(), IngestionError> {
        let dedup_key = signature.dedup_key(pool_id);
        if self.trade_store.has_seen(&dedup_key) {
            self.metrics.record_dedup_hit();
            return Ok(());
        }

        let pool = self
            .pool_reader
            .read_pool(pool_id)
            .await
            .map_err(|source| IngestionError::PoolReader { pool_id: pool_id.to_string(), source })?;

        let tx = self
            .rpc
            .get_transaction(signature)
            .await
            .map_err(|source| IngestionError::Transient { signature: signature.to_string(), source })?;

        let Some(tx) = tx else {
            // Transaction not yet visible to this RPC node: transient, do
            // not mark seen.
            return Ok(());
        };

        let instructions: Vec<RawInstruction<'_>> = tx
            .instructions
            .iter()
            .map(|ix| RawInstruction { program_id: &ix.program_id, data_base58: ix.data_base58.as_deref(), data_base64: ix.data_base64.as_deref() })
            .collect();

        let is_swap = is_swap_transaction(
            &tx.meta.log_messages,
            &instructions,
            &self.program_id,
            &self.classifier.swap_instruction_name,
            &self.classifier.extra_log_markers.iter().map(String::as_str).collect::<Vec<_>>(),
        );

        let decoded_events = decode_logs(&tx.meta.log_messages);
        self.metrics.record_events_decoded(decoded_events.len() as u64);
        self.persist_events(&pool, &tx, &decoded_events).await?;

        if is_swap {
            if let Some(trade) = amm::derive_trade(&tx, &pool) {
                self.persist_trade(&trade).await?;
                self.trade_store.insert(dedup_key, tx.slot, trade.clone()).await;
                self.metrics.record_trade_derived();
                let _ = self.trade_notify.send(trade);
                return Ok(());
            }
            debug!(signature = %signature, pool = %pool_id, "swap-classified transaction yielded no vault delta");
        }

        self.trade_store.mark_processed_no_trade(dedup_key, tx.slot);
        Ok(())
    }

    async fn persist_trade(&self, trade: &Trade) -> Result<(), IngestionError> {
        let mut conn = self.db.acquire().await.map_err(|e| IngestionError::Persistence { signature: trade.signature.to_string(), source: e.into() })?;
        persistence::trades::insert_trade(&mut conn, trade)
            .await
            .map_err(|source| IngestionError::Persistence { signature: trade.signature.to_string(), source })
    }

    /// Position of `signature` within its slot's block, used as the
    /// `txnIndex` component of the event key (§4.7). Falls back to 0 when
    /// the block fetch fails or the signature isn't found in it — the same
    /// fallback `get_block_signatures`'s doc comment promises. Cached per
    /// slot for `BLOCK_SIGNATURES_CACHE_TTL` rather than kept forever.
    async fn txn_index_for(&self, slot: u64, signature: &Signature) -> u32 {
        if let Some(cached) = self.block_signatures.get(&slot) {
            let (fetched_at, signatures) = cached.value();
            if fetched_at.elapsed() < BLOCK_SIGNATURES_CACHE_TTL {
                return signatures.iter().position(|s| s == signature).map(|i| i as u32).unwrap_or(0);
            }
        }

        let signatures = match self.rpc.get_block_signatures(slot).await {
            Ok(Some(signatures)) => Arc::new(signatures),
            Ok(None) | Err(_) => Arc::new(Vec::new()),
        };
        let index = signatures.iter().position(|s| s == signature).map(|i| i as u32).unwrap_or(0);
        self.block_signatures.insert(slot, (Instant::now(), signatures));
        index
    }

    async fn persist_events(&self, pool: &Pool, tx: &rpc::ConfirmedTransaction, decoded: &[DecodedEvent]) -> Result<(), IngestionError> {
        let mut conn = self.db.acquire().await.map_err(|e| IngestionError::Persistence { signature: tx.signature.to_string(), source: e.into() })?;
        let txn_index = self.txn_index_for(tx.slot, &tx.signature).await;

        if decoded.is_empty() {
            if self.persist_raw_fallback {
                let record = EventRecord::raw_fallback(
                    self.program_id.clone(),
                    tx.slot,
                    txn_index,
                    tx.signature.clone(),
                    tx.block_time.unwrap_or(0),
                    tx.meta.log_messages.clone(),
                );
                persistence::events::insert_event(&mut conn, &record)
                    .await
                    .map_err(|source| IngestionError::Persistence { signature: tx.signature.to_string(), source })?;
                let _ = self.event_notify.send(record);
            }
            return Ok(());
        }

        for (event_index, event) in decoded.iter().enumerate() {
            let record = EventRecord {
                key: types::EventKey { program_id: self.program_id.clone(), slot: tx.slot, txn_index, event_index: event_index as u32 },
                signature: tx.signature.clone(),
                block_time: tx.block_time.unwrap_or(0),
                event_type: event.name.clone(),
                event_data: serde_json::to_value(&event.data).unwrap_or(serde_json::Value::Null),
                logs: tx.meta.log_messages.clone(),
            };
            match persistence::events::insert_event(&mut conn, &record).await {
                Ok(()) => {
                    let _ = self.event_notify.send(record);
                }
                Err(source) => {
                    warn!(signature = %tx.signature, pool = %pool.pool_id, error = %source, "failed to persist decoded event");
                    return Err(IngestionError::Persistence { signature: tx.signature.to_string(), source });
                }
            }
        }
        Ok(())
    }
}
