//! # Orbit Stake Indexers
//!
//! Token-vault and NFT stake indexing (C10): one [`TokenVaultIndexer`] per
//! configured vault with boot hydration, recovery and a live log
//! subscription, plus a single program-wide [`NftStakeIndexer`].

pub mod delta;
pub mod error;
pub mod nft;
pub mod token_vault;

pub use delta::derive_stake_deltas;
pub use error::StakeIndexerError;
pub use nft::NftStakeIndexer;
pub use token_vault::TokenVaultIndexer;
