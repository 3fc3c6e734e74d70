use thiserror::Error;

/// §7 error taxonomy, scoped to the Ingestion Engine's own boundary.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Transient: RPC timeout or 5xx. The caller must NOT mark the
    /// signature as processed — retried on the next poll/backfill pass.
    #[error("transient RPC failure for {signature}: {source}")]
    Transient {
        signature: String,
        #[source]
        source: rpc::RpcError,
    },

    #[error("persistence failure for {signature}: {source}")]
    Persistence {
        signature: String,
        #[source]
        source: persistence::PersistenceError,
    },

    #[error("pool reader failure for {pool_id}: {source}")]
    PoolReader {
        pool_id: String,
        #[source]
        source: pool_reader::PoolReaderError,
    },
}
