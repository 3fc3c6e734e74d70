//! # Orbit AMM
//!
//! Trade derivation (C3) and bin/price math for the concentrated-liquidity
//! pool this indexer tracks. The derivation is a pure function over
//! pre/post token-balance deltas — it requires no simulation of the pool's
//! swap curve.

pub mod bin_math;
pub mod tick;
pub mod trade_deriver;

pub use bin_math::{bin_step_multiplier, price_at_bin, q64_64_at_bin};
pub use tick::{tick_from_trade, Tick};
pub use trade_deriver::derive_trade;
