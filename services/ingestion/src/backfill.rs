//! Historical backfill entry point (§4.4c): walks `getSignaturesForAddress`
//! pages backward from the newest signature to `until_slot` (or exhaustion),
//! processing oldest-within-each-page first so trades land in roughly
//! chronological order.

use std::sync::Arc;

use rpc::{RpcClient, SignaturesPage};
use tracing::{info, warn};
use types::Pubkey;

use crate::engine::IngestionEngine;

pub struct BackfillDriver {
    rpc: Arc<dyn RpcClient>,
    engine: Arc<IngestionEngine>,
    pool_id: Pubkey,
    program_id: Pubkey,
    page_limit: u32,
    max_processed: u32,
}

impl BackfillDriver {
    pub fn new(rpc: Arc<dyn RpcClient>, engine: Arc<IngestionEngine>, pool_id: Pubkey, program_id: Pubkey, page_limit: u32, max_processed: u32) -> Self {
        Self { rpc, engine, pool_id, program_id, page_limit, max_processed }
    }

    /// Walks backward until a page contains a signature at or below
    /// `until_slot`, an empty page ends the history, or `max_processed`
    /// signatures have been processed for this pool (a one-time bound on a
    /// boot-time catch-up, not an ongoing budget).
    pub async fn run(&self, until_slot: u64) -> Result<u64, rpc::RpcError> {
        let mut before = None;
        let mut processed = 0u64;

        loop {
            let page = SignaturesPage { limit: self.page_limit, before };
            let signatures = self.rpc.get_signatures_for_address(&self.program_id, page).await?;
            if signatures.is_empty() {
                info!(pool = %self.pool_id, processed, "backfill reached the start of history");
                return Ok(processed);
            }

            let reached_floor = signatures.iter().any(|s| s.slot <= until_slot);

            for info in signatures.iter().rev() {
                if info.slot < until_slot {
                    continue;
                }
                if let Err(e) = self.engine.process_signature_for_pool(&self.pool_id, &info.signature).await {
                    warn!(pool = %self.pool_id, signature = %info.signature, error = %e, "failed to process signature during backfill");
                    continue;
                }
                processed += 1;
                if processed >= self.max_processed as u64 {
                    info!(pool = %self.pool_id, processed, "backfill reached its per-pool cap");
                    return Ok(processed);
                }
            }

            if reached_floor {
                info!(pool = %self.pool_id, processed, until_slot, "backfill reached target slot");
                return Ok(processed);
            }

            before = signatures.last().map(|s| s.signature.clone());
        }
    }
}
