//! # Orbit Persistence
//!
//! Postgres sinks for everything the indexer derives: pools, trades,
//! candles, events, and both staking models.
//!
//! Design: functions that need multiple statements to succeed or fail
//! together take `&mut PgTransaction`; functions that execute a single
//! statement take `&mut PgConnection`. Callers decide whether to fold a
//! call into a larger transaction or run it standalone. Persisters own no
//! in-memory derived state — they are sinks, never a source of truth for
//! the in-process workers.

pub mod candles;
pub mod error;
pub mod events;
pub mod nft_stakes;
pub mod numeric;
pub mod pools;
pub mod stakes;
pub mod trades;

pub use error::PersistenceError;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// Connects lazily with a bounded pool. Lazy so a transient database outage
/// at process start is just another "retry later" condition rather than a
/// boot-time panic.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, PersistenceError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy(database_url)?;
    Ok(pool)
}
