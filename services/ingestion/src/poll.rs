//! Live-poll entry point (§4.4a): periodically lists new signatures for a
//! pool's program id and feeds each one through `processSignatureForPool`.

use std::sync::Arc;
use std::time::Duration;

use rpc::{RpcClient, SignaturesPage};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use types::Pubkey;

use crate::engine::IngestionEngine;

pub struct PollDriver {
    rpc: Arc<dyn RpcClient>,
    engine: Arc<IngestionEngine>,
    pool_id: Pubkey,
    program_id: Pubkey,
    interval: Duration,
    page_limit: u32,
}

impl PollDriver {
    pub fn new(rpc: Arc<dyn RpcClient>, engine: Arc<IngestionEngine>, pool_id: Pubkey, program_id: Pubkey, interval: Duration, page_limit: u32) -> Self {
        Self { rpc, engine, pool_id, program_id, interval, page_limit }
    }

    /// Runs until `token` is cancelled. One pass: list the newest signatures
    /// mentioning this pool's program, oldest-first within the page, and
    /// process any not already in the dedup set.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = interval(self.interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        error!(pool = %self.pool_id, error = %e, "poll pass failed");
                    }
                }
            }
        }
    }

    async fn poll_once(&self) -> Result<(), rpc::RpcError> {
        let page = SignaturesPage { limit: self.page_limit, before: None };
        let signatures = self.rpc.get_signatures_for_address(&self.program_id, page).await?;

        for info in signatures.into_iter().rev() {
            if let Err(e) = self.engine.process_signature_for_pool(&self.pool_id, &info.signature).await {
                warn!(pool = %self.pool_id, signature = %info.signature, error = %e, "failed to process signature during poll");
            }
        }
        Ok(())
    }
}
