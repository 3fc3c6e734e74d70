//! `dex_events` (§6 downstream): strict append, unique on
//! `(program_id, slot, txn_index, event_index)`, never upsert (§4.7 C11).

use sqlx::PgConnection;
use types::EventRecord;

use crate::error::PersistenceError;

pub async fn insert_event(ex: &mut PgConnection, record: &EventRecord) -> Result<(), PersistenceError> {
    let result = sqlx::query(
        r#"
INSERT INTO dex_events (program_id, slot, txn_index, event_index, signature, block_time, event_type, event_data, logs)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
"#,
    )
    .bind(record.key.program_id.as_str())
    .bind(record.key.slot as i64)
    .bind(record.key.txn_index as i32)
    .bind(record.key.event_index as i32)
    .bind(record.signature.as_str())
    .bind(record.block_time)
    .bind(&record.event_type)
    .bind(&record.event_data)
    .bind(&record.logs)
    .execute(ex)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(source) => {
            let err = PersistenceError::Database(source);
            if err.is_unique_violation() {
                // Replay of an already-persisted event: no-op per §7's
                // idempotency-conflict branch.
                tracing::debug!(
                    slot = record.key.slot,
                    txn_index = record.key.txn_index,
                    event_index = record.key.event_index,
                    "duplicate event row, treating as no-op"
                );
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}
