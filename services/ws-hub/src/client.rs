//! Per-connection state and the client registry (§4.9, §5).
//!
//! Each client owns a mutable set of subscribed pool ids. Broadcast is
//! routed: global frames go to every client unconditionally, pool-scoped
//! frames go only to clients whose subscription set contains that pool.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::OutboundFrame;

pub struct Client {
    pub id: Uuid,
    sender: mpsc::UnboundedSender<OutboundFrame>,
    pools: RwLock<HashSet<String>>,
}

impl Client {
    pub fn new(sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self { id: Uuid::new_v4(), sender, pools: RwLock::new(HashSet::new()) }
    }

    pub fn send(&self, frame: OutboundFrame) -> bool {
        self.sender.send(frame).is_ok()
    }

    pub async fn subscribe(&self, pool: String) {
        self.pools.write().await.insert(pool);
    }

    pub async fn unsubscribe(&self, pool: &str) {
        self.pools.write().await.remove(pool);
    }

    pub async fn is_subscribed(&self, pool: &str) -> bool {
        self.pools.read().await.contains(pool)
    }
}

/// Registry of live connections. Reads (broadcast) and writes (connect,
/// disconnect, subscribe) both go through `DashMap`'s internal sharding so
/// neither blocks on a single global lock.
pub struct ClientManager {
    clients: DashMap<Uuid, Arc<Client>>,
    max_connections: usize,
}

impl ClientManager {
    pub fn new(max_connections: usize) -> Self {
        Self { clients: DashMap::new(), max_connections }
    }

    pub fn add_client(&self, client: Arc<Client>) -> Result<(), &'static str> {
        if self.clients.len() >= self.max_connections {
            return Err("maximum connections reached");
        }
        self.clients.insert(client.id, client);
        Ok(())
    }

    pub fn remove_client(&self, client_id: Uuid) {
        if self.clients.remove(&client_id).is_some() {
            debug!(%client_id, "client disconnected");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Sends `frame` to every client the routing rule selects: global
    /// frames to all, pool-scoped frames only to subscribers of that pool.
    pub async fn broadcast(&self, frame: OutboundFrame) {
        let routing_pool = frame.routing_pool();
        let mut stale = Vec::new();

        for entry in self.clients.iter() {
            let deliver = match &routing_pool {
                None => true,
                Some(pool) => entry.value().is_subscribed(pool).await,
            };
            if deliver && !entry.value().send(frame.clone()) {
                stale.push(*entry.key());
            }
        }

        for id in stale {
            self.remove_client(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pool_scoped_frame_reaches_only_subscribers() {
        let manager = ClientManager::new(10);

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let client_a = Arc::new(Client::new(tx_a));
        client_a.subscribe("P1".to_string()).await;
        manager.add_client(client_a.clone()).unwrap();

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let client_b = Arc::new(Client::new(tx_b));
        client_b.subscribe("P2".to_string()).await;
        manager.add_client(client_b.clone()).unwrap();

        manager.broadcast(OutboundFrame::Trade { pool: "P1".to_string(), data: json!({}) }).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn global_frame_reaches_every_client() {
        let manager = ClientManager::new(10);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::new(Client::new(tx));
        manager.add_client(client).unwrap();

        manager.broadcast(OutboundFrame::Hello { program_id: "prog".to_string(), ts: 0 }).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let manager = ClientManager::new(10);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::new(Client::new(tx));
        client.subscribe("P1".to_string()).await;
        manager.add_client(client.clone()).unwrap();

        client.unsubscribe("P1").await;
        manager.broadcast(OutboundFrame::Trade { pool: "P1".to_string(), data: json!({}) }).await;
        assert!(rx.try_recv().is_err());
    }
}
