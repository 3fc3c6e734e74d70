//! # Orbit Aggregators
//!
//! The three per-pool background workers that turn a trade stream into
//! queryable state: the Candle Aggregator (C7), the Volume Aggregator
//! (C8), and the Fee-Vault Refresher (C9). Each subscribes independently
//! to the Ingestion Engine's trade broadcast so a slow consumer never
//! blocks the others.

pub mod candle;
pub mod error;
pub mod fees;
pub mod volume;

pub use candle::CandleAggregator;
pub use error::AggregatorError;
pub use fees::FeeVaultRefresher;
pub use volume::VolumeAggregator;
