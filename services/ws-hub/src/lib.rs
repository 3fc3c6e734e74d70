//! # Orbit WS Hub
//!
//! The client registry and broadcast fan-out (C13): clients subscribe to
//! pools, the Ingestion Engine and Event Persister push `trade`/`event`
//! frames, and the hub routes each frame only to clients that asked for
//! that pool.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tickets;

pub use client::{Client, ClientManager};
pub use config::HubSettings;
pub use error::{Result, WsHubError};
pub use protocol::{InboundFrame, OutboundFrame};
pub use server::{SnapshotSource, WsHub};
pub use tickets::TicketStore;
