use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolReaderError {
    #[error("rpc error reading pool {pool_id}: {source}")]
    Rpc {
        pool_id: String,
        #[source]
        source: rpc::RpcError,
    },

    #[error("pool account {pool_id} not found")]
    AccountNotFound { pool_id: String },

    #[error("malformed pool account blob for {pool_id}: {reason}")]
    MalformedAccount { pool_id: String, reason: &'static str },

    #[error("pool invariant violated for {pool_id}: {source}")]
    Invariant {
        pool_id: String,
        #[source]
        source: types::PoolInvariantError,
    },
}
