//! Log-subscription entry point (§4.4b): a persistent `logsSubscribe`
//! stream, reconnected on drop, feeding each notified signature through
//! `processSignatureForPool`.

use std::sync::Arc;
use std::time::Duration;

use metrics::Metrics;
use rpc::{LogFilter, RpcClient};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use types::Pubkey;

use crate::engine::IngestionEngine;

pub struct SubscribeDriver {
    rpc: Arc<dyn RpcClient>,
    engine: Arc<IngestionEngine>,
    pool_id: Pubkey,
    program_id: Pubkey,
    reconnect_backoff: Duration,
    metrics: Arc<Metrics>,
}

impl SubscribeDriver {
    pub fn new(rpc: Arc<dyn RpcClient>, engine: Arc<IngestionEngine>, pool_id: Pubkey, program_id: Pubkey, reconnect_backoff: Duration, metrics: Arc<Metrics>) -> Self {
        Self { rpc, engine, pool_id, program_id, reconnect_backoff, metrics }
    }

    /// Runs until `token` is cancelled, reconnecting on every stream drop —
    /// the websocket carries no delivery guarantee across a gap, so the
    /// poll driver running alongside it is what provides coverage (§4.4).
    pub async fn run(self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                return;
            }

            let mut subscription = match self.rpc.subscribe_logs(LogFilter::Program(self.program_id.clone())).await {
                Ok(sub) => sub,
                Err(e) => {
                    self.metrics.record_rpc_retry();
                    error!(pool = %self.pool_id, error = %e, "log subscription failed to connect, retrying");
                    sleep(self.reconnect_backoff).await;
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        subscription.unsubscribe();
                        return;
                    }
                    notification = subscription.next() => {
                        let Some(notification) = notification else {
                            self.metrics.record_rpc_retry();
                            warn!(pool = %self.pool_id, "log subscription stream closed, reconnecting");
                            break;
                        };
                        if let Err(e) = self.engine.process_signature_for_pool(&self.pool_id, &notification.signature).await {
                            warn!(pool = %self.pool_id, signature = %notification.signature, error = %e, "failed to process signature from subscription");
                        }
                    }
                }
            }

            sleep(self.reconnect_backoff).await;
        }
    }
}
