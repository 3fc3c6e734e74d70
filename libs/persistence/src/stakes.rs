//! `streamflow_vaults`, `streamflow_stakes((vault_id, owner) PK)`,
//! `streamflow_events((vault_id, signature, owner) PK)` (§6 downstream).
//!
//! Flush order matters (§4.8): events are appended before the per-owner
//! mutation is applied, so the audit trail is authoritative even if the
//! process dies mid-flush. A duplicate event row is a no-op, not a failure;
//! the caller has already deduped `seenSignatures` in memory.

use bigdecimal::BigDecimal;
use sqlx::PgConnection;

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct StakeEventInsert {
    pub vault_id: String,
    pub signature: String,
    pub owner: String,
    pub slot: i64,
    pub delta_raw: BigDecimal,
    pub balance_after_raw: BigDecimal,
}

/// Strict append, `(vault_id, signature, owner)` unique. Call this before
/// [`upsert_owner_stake`]/[`delete_owner_stake`] for the same delta.
pub async fn insert_stake_event(ex: &mut PgConnection, event: &StakeEventInsert) -> Result<(), PersistenceError> {
    let result = sqlx::query(
        r#"
INSERT INTO streamflow_events (vault_id, signature, owner, slot, delta_raw, balance_after_raw)
VALUES ($1, $2, $3, $4, $5, $6)
"#,
    )
    .bind(&event.vault_id)
    .bind(&event.signature)
    .bind(&event.owner)
    .bind(event.slot)
    .bind(&event.delta_raw)
    .bind(&event.balance_after_raw)
    .execute(ex)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(source) => {
            let err = PersistenceError::Database(source);
            if err.is_unique_violation() {
                tracing::debug!(vault_id = %event.vault_id, signature = %event.signature, owner = %event.owner, "duplicate stake event row, treating as no-op");
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

/// Upsert a staking owner whose cumulative balance is still positive.
/// Callers with a balance `<= 0` must use [`delete_owner_stake`] instead —
/// `byOwner` never holds non-positive entries (§3 invariant).
pub async fn upsert_owner_stake(
    ex: &mut PgConnection,
    vault_id: &str,
    owner: &str,
    staked_raw: &BigDecimal,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
INSERT INTO streamflow_stakes (vault_id, owner, staked_raw, updated_at)
VALUES ($1, $2, $3, now())
ON CONFLICT (vault_id, owner) DO UPDATE SET staked_raw = EXCLUDED.staked_raw, updated_at = now()
"#,
    )
    .bind(vault_id)
    .bind(owner)
    .bind(staked_raw)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn delete_owner_stake(ex: &mut PgConnection, vault_id: &str, owner: &str) -> Result<(), PersistenceError> {
    sqlx::query("DELETE FROM streamflow_stakes WHERE vault_id = $1 AND owner = $2")
        .bind(vault_id)
        .bind(owner)
        .execute(ex)
        .await?;
    Ok(())
}

/// Vault totals are written after the per-owner writes succeed (§4.8).
pub async fn update_vault_totals(
    ex: &mut PgConnection,
    vault_id: &str,
    holders_count: i64,
    total_staked_raw: &BigDecimal,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
UPDATE streamflow_vaults
SET holders_count = $2, total_staked_raw = $3, updated_at = now()
WHERE vault_id = $1
"#,
    )
    .bind(vault_id)
    .bind(holders_count)
    .bind(total_staked_raw)
    .execute(ex)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VaultRow {
    pub vault_id: String,
    pub token_mint: String,
    pub scan_address: String,
    pub stake_program: String,
    pub decimals: i16,
    pub holders_count: i64,
    pub total_staked_raw: BigDecimal,
}

pub async fn get_vault(ex: &mut PgConnection, vault_id: &str) -> Result<Option<VaultRow>, PersistenceError> {
    let row = sqlx::query_as(
        r#"
SELECT vault_id, token_mint, scan_address, stake_program, decimals, holders_count, total_staked_raw
FROM streamflow_vaults WHERE vault_id = $1
"#,
    )
    .bind(vault_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StakeRow {
    pub vault_id: String,
    pub owner: String,
    pub staked_raw: BigDecimal,
}

/// Boot-time hydration of `byOwner` (§4.8 step 1).
pub async fn get_vault_stakes(ex: &mut PgConnection, vault_id: &str) -> Result<Vec<StakeRow>, PersistenceError> {
    let rows = sqlx::query_as("SELECT vault_id, owner, staked_raw FROM streamflow_stakes WHERE vault_id = $1")
        .bind(vault_id)
        .fetch_all(ex)
        .await?;
    Ok(rows)
}

/// The highest slot recorded for this vault's events, used as the recovery
/// watermark (§4.8 step 3). `None` means no event has ever been persisted
/// for this vault, in which case the caller falls back to the last N
/// signatures.
pub async fn get_last_event_slot(ex: &mut PgConnection, vault_id: &str) -> Result<Option<i64>, PersistenceError> {
    let slot: Option<i64> = sqlx::query_scalar("SELECT MAX(slot) FROM streamflow_events WHERE vault_id = $1")
        .bind(vault_id)
        .fetch_one(ex)
        .await?;
    Ok(slot)
}

/// Hydrates `seenSignatures` for a vault (§4.8 step 2).
pub async fn get_seen_signatures(ex: &mut PgConnection, vault_id: &str) -> Result<Vec<String>, PersistenceError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT signature FROM streamflow_events WHERE vault_id = $1")
        .bind(vault_id)
        .fetch_all(ex)
        .await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}
