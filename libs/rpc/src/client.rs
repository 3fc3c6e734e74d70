use async_trait::async_trait;
use types::{Pubkey, Signature};

use crate::error::RpcError;
use crate::model::{ConfirmedTransaction, LogFilter, SignatureInfo};
use crate::ws::LogSubscription;

/// Parameters for `getSignaturesForAddress` (§6): `limit` is clamped to 1000
/// by the caller, `before` paginates backward.
#[derive(Debug, Clone, Default)]
pub struct SignaturesPage {
    pub limit: u32,
    pub before: Option<Signature>,
}

/// C1: the thin contract this indexer requires of the chain's validator RPC.
/// Every method is a suspension point (§5) — no critical section may span a
/// call to one of these.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        page: SignaturesPage,
    ) -> Result<Vec<SignatureInfo>, RpcError>;

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<ConfirmedTransaction>, RpcError>;

    async fn get_account_info(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>, RpcError>;

    async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, RpcError>;

    /// Scans every account owned by `program_id` whose data length is
    /// exactly `data_len`, used by discovery mode (§C.5) to find newly
    /// created pool accounts without a pool id list.
    async fn get_program_accounts(&self, program_id: &Pubkey, data_len: usize) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError>;

    async fn get_slot(&self) -> Result<u64, RpcError>;

    async fn get_block_time(&self, slot: u64) -> Result<Option<i64>, RpcError>;

    /// Map a slot to its block's signature order, used by the Event
    /// Persister (§4.7) to derive `txnIndex`. Returns `None` if the block
    /// fetch fails (caller falls back to `txnIndex = 0`).
    async fn get_block_signatures(&self, slot: u64) -> Result<Option<Vec<Signature>>, RpcError>;

    /// Open a persistent log-notification stream. The returned handle is
    /// unsubscribed when dropped or when `unsubscribe()` is called.
    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogSubscription, RpcError>;
}
