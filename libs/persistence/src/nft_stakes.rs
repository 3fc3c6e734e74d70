//! `nft_stakes((nft_mint, owner) PK)` (§6 downstream). Status transitions
//! `active -> unlocked (by time) -> withdrawn (by unstake)` are computed by
//! the caller from `unlock_at_sec` vs. wall clock; this module only
//! persists whatever status the indexer has already decided.

use sqlx::PgConnection;
use types::NftStakeStatus;

use crate::error::PersistenceError;

fn status_as_str(status: NftStakeStatus) -> &'static str {
    match status {
        NftStakeStatus::Active => "active",
        NftStakeStatus::Unlocked => "unlocked",
        NftStakeStatus::Withdrawn => "withdrawn",
    }
}

fn status_from_str(value: &str) -> NftStakeStatus {
    match value {
        "unlocked" => NftStakeStatus::Unlocked,
        "withdrawn" => NftStakeStatus::Withdrawn,
        _ => NftStakeStatus::Active,
    }
}

pub async fn upsert_nft_stake(
    ex: &mut PgConnection,
    nft_mint: &str,
    owner: &str,
    stake_account: &str,
    lock_duration_sec: i64,
    unlock_at_sec: i64,
    status: NftStakeStatus,
    associated_pool: Option<&str>,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
INSERT INTO nft_stakes (
    nft_mint, owner, stake_account, lock_duration_sec, unlock_at_sec, status, associated_pool, updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, now())
ON CONFLICT (nft_mint, owner) DO UPDATE SET
    stake_account = EXCLUDED.stake_account,
    lock_duration_sec = EXCLUDED.lock_duration_sec,
    unlock_at_sec = EXCLUDED.unlock_at_sec,
    status = EXCLUDED.status,
    associated_pool = EXCLUDED.associated_pool,
    updated_at = now()
"#,
    )
    .bind(nft_mint)
    .bind(owner)
    .bind(stake_account)
    .bind(lock_duration_sec)
    .bind(unlock_at_sec)
    .bind(status_as_str(status))
    .bind(associated_pool)
    .execute(ex)
    .await?;
    Ok(())
}

/// Unstake: a withdrawal moves the row to `withdrawn` rather than deleting
/// it, preserving the audit trail an NFT stake row represents.
pub async fn mark_withdrawn(ex: &mut PgConnection, nft_mint: &str, owner: &str) -> Result<(), PersistenceError> {
    sqlx::query("UPDATE nft_stakes SET status = 'withdrawn', updated_at = now() WHERE nft_mint = $1 AND owner = $2")
        .bind(nft_mint)
        .bind(owner)
        .execute(ex)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct NftStakeRowRaw {
    nft_mint: String,
    owner: String,
    stake_account: String,
    lock_duration_sec: i64,
    unlock_at_sec: i64,
    status: String,
    associated_pool: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NftStakeRow {
    pub nft_mint: String,
    pub owner: String,
    pub stake_account: String,
    pub lock_duration_sec: i64,
    pub unlock_at_sec: i64,
    pub status: NftStakeStatus,
    pub associated_pool: Option<String>,
}

pub async fn get_nft_stake(ex: &mut PgConnection, nft_mint: &str, owner: &str) -> Result<Option<NftStakeRow>, PersistenceError> {
    let raw: Option<NftStakeRowRaw> =
        sqlx::query_as("SELECT nft_mint, owner, stake_account, lock_duration_sec, unlock_at_sec, status, associated_pool FROM nft_stakes WHERE nft_mint = $1 AND owner = $2")
            .bind(nft_mint)
            .bind(owner)
            .fetch_optional(ex)
            .await?;

    Ok(raw.map(|r| NftStakeRow {
        nft_mint: r.nft_mint,
        owner: r.owner,
        stake_account: r.stake_account,
        lock_duration_sec: r.lock_duration_sec,
        unlock_at_sec: r.unlock_at_sec,
        status: status_from_str(&r.status),
        associated_pool: r.associated_pool,
    }))
}
