//! `dex_trades` (§6 downstream): one row per `(signature, poolId)`,
//! at-least-once with an idempotent key (§1 Non-goals — no strict
//! exactly-once requirement at this boundary).

use serde::Serialize;
use sqlx::PgConnection;
use types::Trade;

use crate::error::PersistenceError;
use crate::numeric::atoms_to_numeric;

pub async fn insert_trade(ex: &mut PgConnection, trade: &Trade) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
INSERT INTO dex_trades (signature, pool_id, slot, block_time, "user", in_mint, out_mint, amount_in_raw, amount_out_raw)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (signature, pool_id) DO NOTHING
"#,
    )
    .bind(trade.signature.as_str())
    .bind(trade.pool_id.as_str())
    .bind(trade.slot as i64)
    .bind(trade.block_time)
    .bind(trade.user.as_ref().map(|u| u.as_str()))
    .bind(trade.in_mint.as_ref().map(|m| m.as_str()))
    .bind(trade.out_mint.as_ref().map(|m| m.as_str()))
    .bind(trade.amount_in_atoms.as_ref().map(atoms_to_numeric))
    .bind(trade.amount_out_atoms.as_ref().map(atoms_to_numeric))
    .execute(ex)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TradeRow {
    pub signature: String,
    pub pool_id: String,
    pub slot: i64,
    pub block_time: Option<i64>,
    #[sqlx(rename = "user")]
    pub user: Option<String>,
    pub in_mint: Option<String>,
    pub out_mint: Option<String>,
}

/// Most recent `limit` trades for `pool_id`, newest-first — backs both the
/// WS Hub's `snapshot` frame (§4.9) and a routing façade.
pub async fn get_recent_trades(ex: &mut PgConnection, pool_id: &str, limit: i64) -> Result<Vec<TradeRow>, PersistenceError> {
    let rows = sqlx::query_as(
        r#"
SELECT signature, pool_id, slot, block_time, "user", in_mint, out_mint
FROM dex_trades
WHERE pool_id = $1
ORDER BY block_time DESC NULLS LAST, slot DESC
LIMIT $2
"#,
    )
    .bind(pool_id)
    .bind(limit)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}
