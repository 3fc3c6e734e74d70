//! `dex_pools` (§6 downstream): per-pool static metadata plus slot-gated
//! derived state (C12). The fee-vault addresses, bin step and raw
//! `Q64_64` price live only in the Pool Reader's in-memory cache (§4.3);
//! this table stores the UI-facing, persisted projection of a pool.

use bigdecimal::BigDecimal;
use sqlx::PgConnection;
use types::Pool;

use crate::error::PersistenceError;

/// Insert a pool's static metadata the first time the Pool Reader resolves
/// it. Fields that the reader re-derives on every read (active bin, price,
/// slot) are left to [`update_derived_state`]'s slot-gated path.
pub async fn upsert_pool_static(ex: &mut PgConnection, program_id: &str, pool: &Pool) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
INSERT INTO dex_pools (
    pool_id, program_id, base_mint, quote_mint, base_decimals, quote_decimals,
    base_vault, quote_vault, lp_mint, last_update_slot, updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
ON CONFLICT (pool_id) DO UPDATE SET
    base_mint = EXCLUDED.base_mint,
    quote_mint = EXCLUDED.quote_mint,
    base_decimals = EXCLUDED.base_decimals,
    quote_decimals = EXCLUDED.quote_decimals,
    base_vault = EXCLUDED.base_vault,
    quote_vault = EXCLUDED.quote_vault,
    lp_mint = EXCLUDED.lp_mint
"#,
    )
    .bind(pool.pool_id.as_str())
    .bind(program_id)
    .bind(pool.base_mint.as_str())
    .bind(pool.quote_mint.as_str())
    .bind(pool.base_decimals as i16)
    .bind(pool.quote_decimals as i16)
    .bind(pool.base_vault.as_str())
    .bind(pool.quote_vault.as_str())
    .bind(pool.lp_mint.as_ref().map(|m| m.as_str()))
    .bind(pool.last_update_slot as i64)
    .execute(ex)
    .await?;
    Ok(())
}

/// Slot-gated update of live pool state (§4.7, C12): applies only if
/// `slot` strictly exceeds the stored `last_update_slot`. Returns whether
/// the row was actually updated, so callers can tell a stale write from a
/// fresh one without a separate read.
pub async fn update_derived_state(
    ex: &mut PgConnection,
    pool_id: &str,
    slot: u64,
    active_bin: i32,
    last_price_quote_per_base: BigDecimal,
    liquidity_quote: BigDecimal,
    tvl_locked_quote: BigDecimal,
) -> Result<bool, PersistenceError> {
    let result = sqlx::query(
        r#"
UPDATE dex_pools
SET active_bin = $2,
    last_price_quote_per_base = $3,
    liquidity_quote = $4,
    tvl_locked_quote = $5,
    last_update_slot = $6,
    updated_at = now()
WHERE pool_id = $1 AND (last_update_slot IS NULL OR last_update_slot < $6)
"#,
    )
    .bind(pool_id)
    .bind(active_bin)
    .bind(last_price_quote_per_base)
    .bind(liquidity_quote)
    .bind(tvl_locked_quote)
    .bind(slot as i64)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_fee_ui(
    ex: &mut PgConnection,
    pool_id: &str,
    creator_fee_ui: BigDecimal,
    holders_fee_ui: BigDecimal,
    nft_fee_ui: BigDecimal,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
UPDATE dex_pools
SET creator_fee_ui = $2, holders_fee_ui = $3, nft_fee_ui = $4, updated_at = now()
WHERE pool_id = $1
"#,
    )
    .bind(pool_id)
    .bind(creator_fee_ui)
    .bind(holders_fee_ui)
    .bind(nft_fee_ui)
    .execute(ex)
    .await?;
    Ok(())
}

/// The persisted, UI-facing projection of a pool — the columns a routing
/// façade (C14) would read. Distinct from [`types::Pool`], which also
/// carries the fee-vault addresses and raw on-chain price the Pool Reader
/// resolves but this table does not store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersistedPool {
    pub pool_id: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub base_decimals: i16,
    pub quote_decimals: i16,
    pub base_vault: String,
    pub quote_vault: String,
    pub lp_mint: Option<String>,
    pub active_bin: Option<i32>,
    pub last_price_quote_per_base: Option<BigDecimal>,
    pub liquidity_quote: Option<BigDecimal>,
    pub tvl_locked_quote: Option<BigDecimal>,
    pub creator_fee_ui: Option<BigDecimal>,
    pub holders_fee_ui: Option<BigDecimal>,
    pub nft_fee_ui: Option<BigDecimal>,
    pub last_update_slot: Option<i64>,
}

pub async fn get_pool(ex: &mut PgConnection, pool_id: &str) -> Result<Option<PersistedPool>, PersistenceError> {
    let row = sqlx::query_as(
        r#"
SELECT pool_id, base_mint, quote_mint, base_decimals, quote_decimals,
       base_vault, quote_vault, lp_mint, active_bin, last_price_quote_per_base,
       liquidity_quote, tvl_locked_quote, creator_fee_ui, holders_fee_ui, nft_fee_ui,
       last_update_slot
FROM dex_pools WHERE pool_id = $1
"#,
    )
    .bind(pool_id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}
