//! # Orbit RPC
//!
//! The contract this indexer requires of the chain's validator RPC (C1):
//! signature enumeration, transaction fetch, account reads, and a
//! log-notification websocket stream. [`HttpRpcClient`] is the production
//! implementation; downstream crates depend only on the [`RpcClient`] trait
//! so tests can substitute a fake.

pub mod client;
pub mod error;
pub mod http;
pub mod model;
pub mod ws;

pub use client::{RpcClient, SignaturesPage};
pub use error::RpcError;
pub use http::HttpRpcClient;
pub use model::{CompiledInstruction, ConfirmedTransaction, LogFilter, LogNotification, SignatureInfo, TokenBalanceEntry, TransactionMeta};
pub use ws::LogSubscription;
