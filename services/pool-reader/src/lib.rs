//! # Orbit Pool Reader
//!
//! Cached reader for the on-chain pool account (C4): a 10-15s per-pool TTL
//! cache over a fixed-layout account blob, plus a batched mint-decimals
//! lookup that caches the same way.

pub mod error;
pub mod layout;
pub mod reader;

pub use error::PoolReaderError;
pub use reader::PoolReader;
