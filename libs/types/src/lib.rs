//! # Orbit Types
//!
//! Shared domain types for the Orbit on-chain indexer: pools, trades,
//! candles, volume windows, fee balances, stake state and the persisted
//! event log. Every amount that can overflow a 64-bit integer is modeled in
//! arbitrary precision (`common::atoms`); conversion to fixed-width decimals
//! happens only at the UI/serialization boundary.
//!
//! ## Quick start
//!
//! ```rust
//! use types::{Pubkey, Pool, Q64_64};
//!
//! let pool_id = Pubkey::new_unchecked("Pool11111111111111111111111111111111111111");
//! ```

pub mod candle;
pub mod common;
pub mod event;
pub mod fee;
pub mod pool;
pub mod stake;
pub mod trade;
pub mod volume;

pub use candle::{Candle, CandleInvariantError, Timeframe};
pub use common::{Atoms, AtomsDelta, FixedPointError, Pubkey, Q64_64, Signature, ValidationError};
pub use event::{DecodedEvent, EventKey, EventRecord};
pub use fee::FeeUi;
pub use pool::{Pool, PoolInvariantError};
pub use stake::{NftStake, NftStakeStatus, StakeInvariantError, TokenVaultStake};
pub use trade::Trade;
pub use volume::{VolumeTimeframe, VolumeWindow};
