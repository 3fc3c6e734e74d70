//! Stake state: token-vault staking and NFT staking (C10).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::common::{Atoms, Pubkey, Signature};

/// Per-vault token staking state. Invariants (§3, §8 property 5):
/// `total = Σ byOwner.values`, `holders = |byOwner|`, no entry ≤ 0.
#[derive(Debug, Clone)]
pub struct TokenVaultStake {
    pub id: Pubkey,
    pub token_mint: Pubkey,
    pub scan_address: Pubkey,
    pub stake_program: Pubkey,
    pub decimals: u8,
    by_owner: HashMap<Pubkey, Atoms>,
    seen_signatures: HashMap<Signature, u64>,
    dirty_owners: HashSet<Pubkey>,
    dirty_totals: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StakeInvariantError {
    #[error("owner {0} has non-positive stored balance")]
    NonPositiveBalance(String),
    #[error("total {total} does not equal sum of owner balances {sum}")]
    TotalMismatch { total: String, sum: String },
}

impl TokenVaultStake {
    pub fn new(id: Pubkey, token_mint: Pubkey, scan_address: Pubkey, stake_program: Pubkey, decimals: u8) -> Self {
        Self {
            id,
            token_mint,
            scan_address,
            stake_program,
            decimals,
            by_owner: HashMap::new(),
            seen_signatures: HashMap::new(),
            dirty_owners: HashSet::new(),
            dirty_totals: false,
        }
    }

    /// Boot-time hydration of a single owner balance from a persisted
    /// snapshot. Unlike [`Self::apply_delta`] this never marks the owner
    /// dirty — the value is already what's on disk.
    pub fn hydrate_owner(&mut self, owner: Pubkey, balance: Atoms) {
        if !balance.is_zero() {
            self.by_owner.insert(owner, balance);
        }
    }

    pub fn has_seen(&self, sig: &Signature) -> bool {
        self.seen_signatures.contains_key(sig)
    }

    pub fn mark_seen(&mut self, sig: Signature, slot: u64) {
        self.seen_signatures.insert(sig, slot);
    }

    /// Discard signatures observed at or below `below_slot` (§9 compaction).
    pub fn compact_seen_before(&mut self, below_slot: u64) {
        self.seen_signatures.retain(|_, slot| *slot >= below_slot);
    }

    /// Apply a signed delta to `owner`'s cumulative stake. A decrease in the
    /// owner's own token balance is a stake (handled by the caller negating
    /// the delta before calling this); this method only tracks magnitude and
    /// owner add/remove based on the resulting sign.
    pub fn apply_delta(&mut self, owner: Pubkey, staked_change: &crate::common::AtomsDelta) {
        let current = self
            .by_owner
            .get(&owner)
            .cloned()
            .unwrap_or_else(Atoms::zero);
        let current_signed = num_bigint::BigInt::from_biguint(
            num_bigint::Sign::Plus,
            current.as_biguint().clone(),
        );
        let new_signed = current_signed + signed_value(staked_change);
        self.dirty_owners.insert(owner.clone());
        self.dirty_totals = true;
        if new_signed.sign() == num_bigint::Sign::Plus {
            self.by_owner
                .insert(owner, Atoms::from_biguint(new_signed.magnitude().clone()));
        } else {
            // Zero or negative cumulative balance removes the owner (§4.8).
            self.by_owner.remove(&owner);
        }
    }

    pub fn balance_of(&self, owner: &Pubkey) -> Atoms {
        self.by_owner.get(owner).cloned().unwrap_or_else(Atoms::zero)
    }

    pub fn holders(&self) -> usize {
        self.by_owner.len()
    }

    pub fn total(&self) -> Atoms {
        self.by_owner
            .values()
            .fold(Atoms::zero(), |acc, v| acc.checked_add(v))
    }

    pub fn dirty_owners(&self) -> impl Iterator<Item = &Pubkey> {
        self.dirty_owners.iter()
    }

    pub fn take_dirty(&mut self) -> (HashSet<Pubkey>, bool) {
        let owners = std::mem::take(&mut self.dirty_owners);
        let totals = std::mem::replace(&mut self.dirty_totals, false);
        (owners, totals)
    }

    /// §8 property 5.
    pub fn validate(&self) -> Result<(), StakeInvariantError> {
        for (owner, balance) in &self.by_owner {
            if balance.is_zero() {
                return Err(StakeInvariantError::NonPositiveBalance(owner.to_string()));
            }
        }
        Ok(())
    }
}

fn signed_value(delta: &crate::common::AtomsDelta) -> num_bigint::BigInt {
    // AtomsDelta doesn't expose its inner BigInt directly; reconstruct via
    // magnitude + sign, which is the only boundary-crossing this module needs.
    let mag = num_bigint::BigInt::from_biguint(num_bigint::Sign::Plus, delta.magnitude().as_biguint().clone());
    if delta.is_negative() {
        -mag
    } else {
        mag
    }
}

/// NFT stake status (§3): unlocked/active is purely `now ≥ unlockAtSec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NftStakeStatus {
    Active,
    Unlocked,
    Withdrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftStake {
    pub nft_mint: Pubkey,
    pub owner: Pubkey,
    pub stake_account: Pubkey,
    pub lock_duration_sec: i64,
    pub unlock_at_sec: i64,
    pub status: NftStakeStatus,
    pub associated_pool: Option<Pubkey>,
}

impl NftStake {
    /// Status is purely a function of time for the active/unlocked boundary;
    /// `Withdrawn` is terminal and never recomputed from `now`.
    pub fn effective_status(&self, now_sec: i64) -> NftStakeStatus {
        match self.status {
            NftStakeStatus::Withdrawn => NftStakeStatus::Withdrawn,
            _ if now_sec >= self.unlock_at_sec => NftStakeStatus::Unlocked,
            _ => NftStakeStatus::Active,
        }
    }
}
