use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakeIndexerError {
    #[error("rpc failure: {0}")]
    Rpc(#[from] rpc::RpcError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] persistence::PersistenceError),
}
