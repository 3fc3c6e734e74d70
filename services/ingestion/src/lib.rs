//! # Orbit Ingestion
//!
//! The Ingestion Engine (C5) and its trade store (C6): a single per-pool
//! `process_signature_for_pool` function fed by three independent entry
//! points — live poll, log subscription, and historical backfill — all
//! sharing one dedup set so none of them can double-count a signature.

pub mod backfill;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod poll;
pub mod subscribe;
pub mod trade_store;

pub use backfill::BackfillDriver;
pub use dedup::DedupSet;
pub use engine::{IngestionEngine, SwapClassifierConfig};
pub use error::IngestionError;
pub use poll::PollDriver;
pub use subscribe::SubscribeDriver;
pub use trade_store::TradeStore;
