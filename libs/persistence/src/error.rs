use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to serialize {what} for persistence: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    /// The "idempotency conflict" branch of the error taxonomy (§7): a
    /// unique-constraint violation on a strict-append table is a no-op, not
    /// a failure, because the caller has already deduped in memory.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            PersistenceError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    }
}
