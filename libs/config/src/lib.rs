//! # Orbit Config
//!
//! Process configuration for the indexer: a TOML file with sane defaults,
//! environment variable overrides, and a `validate()` boundary check before
//! any worker starts.

pub mod indexer;

pub use indexer::{IndexerConfig, LogFormat, TokenVaultConfig};
