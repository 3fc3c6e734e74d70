//! WS Hub server (C13): warp-based WebSocket upgrade, per-connection
//! inbound-frame loop, and the broadcast entry point the rest of the
//! process drives (fed by the Ingestion Engine and the Event Persister).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};
use warp::Filter;

use crate::client::{Client, ClientManager};
use crate::config::HubSettings;
use crate::error::{Result, WsHubError};
use crate::protocol::{InboundFrame, OutboundFrame};
use crate::tickets::TicketStore;

/// Supplies the most recent trades for a pool to satisfy a `subscribe`'s
/// `snapshot` response (§4.9). Backed by `persistence::get_recent_trades`
/// in the wired process; kept generic here so this crate has no direct
/// dependency on `persistence`.
pub trait SnapshotSource: Send + Sync {
    fn recent_trades(&self, pool: &str, limit: usize) -> Vec<Value>;
}

pub struct WsHub {
    settings: HubSettings,
    clients: Arc<ClientManager>,
    tickets: Arc<TicketStore>,
    program_id: String,
}

impl WsHub {
    pub fn new(settings: HubSettings, program_id: String) -> Self {
        let clients = Arc::new(ClientManager::new(settings.max_connections));
        let tickets = Arc::new(TicketStore::new(settings.ticket_ttl_sec));
        Self { settings, clients, tickets, program_id }
    }

    pub fn ticket_store(&self) -> Arc<TicketStore> {
        self.tickets.clone()
    }

    pub fn clients(&self) -> Arc<ClientManager> {
        self.clients.clone()
    }

    /// Pushes a frame from the rest of the process (Ingestion Engine for
    /// `trade`, Event Persister for `event`) to the routed set of clients.
    pub async fn publish(&self, frame: OutboundFrame) {
        self.clients.broadcast(frame).await;
    }

    pub async fn serve(self: Arc<Self>, snapshots: Arc<dyn SnapshotSource>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.settings.bind_address, self.settings.port)
            .parse()
            .map_err(|_| WsHubError::Client { message: "invalid bind address".to_string() })?;

        let hub = self.clone();
        let ws_route = warp::path("ws")
            .and(warp::ws())
            .and(warp::query::<HashMap<String, String>>())
            .map(move |ws: warp::ws::Ws, query: HashMap<String, String>| {
                let hub = hub.clone();
                let snapshots = snapshots.clone();
                ws.on_upgrade(move |socket| async move {
                    let ticket = query.get("ticket").cloned().unwrap_or_default();
                    if !hub.tickets.redeem(&ticket) {
                        warn!("admission denied: invalid or expired ticket");
                        let (mut sink, _) = socket.split();
                        let _ = sink
                            .send(warp::ws::Message::close_with(1008u16, "invalid or expired ticket"))
                            .await;
                        return;
                    }
                    hub.handle_connection(socket, snapshots).await;
                })
            });

        let health_route = warp::path("health").map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

        let routes = ws_route.or(health_route);

        let cors_origins = self.settings.cors_origins.clone();
        if cors_origins.is_empty() {
            warp::serve(routes).run(addr).await;
        } else {
            let cors = warp::cors().allow_origins(cors_origins.iter().map(String::as_str));
            warp::serve(routes.with(cors)).run(addr).await;
        }

        Ok(())
    }

    async fn handle_connection(&self, ws: warp::ws::WebSocket, snapshots: Arc<dyn SnapshotSource>) {
        let (mut ws_sender, mut ws_receiver) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();

        let client = Arc::new(Client::new(tx));
        if self.clients.add_client(client.clone()).is_err() {
            warn!("rejecting connection: at capacity");
            return;
        }

        let hello = OutboundFrame::Hello { program_id: self.program_id.clone(), ts: now_unix_sec() };
        let _ = client.send(hello);

        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    match outbound {
                        Some(frame) => {
                            let json = match serde_json::to_string(&frame) {
                                Ok(s) => s,
                                Err(e) => { warn!(error = %e, "failed to serialize outbound frame"); continue; }
                            };
                            if ws_sender.send(warp::ws::Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                inbound = ws_receiver.next() => {
                    match inbound {
                        Some(Ok(message)) if message.is_text() => {
                            self.handle_inbound_text(&client, message.to_str().unwrap_or_default(), &snapshots).await;
                        }
                        Some(Ok(message)) if message.is_close() => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => { warn!(error = %e, "websocket read error"); break; }
                        None => break,
                    }
                }
            }
        }

        self.clients.remove_client(client.id);
    }

    async fn handle_inbound_text(&self, client: &Arc<Client>, text: &str, snapshots: &Arc<dyn SnapshotSource>) {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "malformed inbound frame, ignoring");
                return;
            }
        };

        match frame {
            InboundFrame::Subscribe { pool, limit } => {
                client.subscribe(pool.clone()).await;
                let limit = limit.unwrap_or(self.settings.snapshot_limit_default);
                let trades = snapshots.recent_trades(&pool, limit);
                client.send(OutboundFrame::Snapshot { pool, trades, ts: now_unix_sec() });
            }
            InboundFrame::Unsubscribe { pool } => {
                client.unsubscribe(&pool).await;
            }
        }
    }
}

fn now_unix_sec() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptySnapshots;
    impl SnapshotSource for EmptySnapshots {
        fn recent_trades(&self, _pool: &str, _limit: usize) -> Vec<Value> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn hub_tracks_zero_clients_on_creation() {
        let hub = WsHub::new(HubSettings::default(), "prog".to_string());
        assert_eq!(hub.clients().client_count(), 0);
        let _ = EmptySnapshots;
    }
}
