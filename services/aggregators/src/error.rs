use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("persistence failure: {0}")]
    Persistence(#[from] persistence::PersistenceError),

    #[error("pool reader failure: {0}")]
    PoolReader(#[from] pool_reader::PoolReaderError),

    #[error("rpc failure: {0}")]
    Rpc(#[from] rpc::RpcError),
}
