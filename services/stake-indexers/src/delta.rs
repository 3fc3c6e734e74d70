//! Token-vault stake delta derivation (§4.8): a pure function over a
//! transaction's pre/post token-balance deltas, in the same style as
//! `amm::trade_deriver`'s vault-delta derivation but scanning every account
//! touching the vault's mint instead of two fixed vault indices.

use std::collections::BTreeSet;

use rpc::{ConfirmedTransaction, TokenBalanceEntry};
use types::{Atoms, AtomsDelta, Pubkey};

/// One entry per `(accountIndex, owner, mint)` whose mint matches
/// `token_mint`: `delta = post - pre`. Accounts with no owner on either side
/// are skipped — an anonymous balance change can't be attributed to a
/// staker.
pub fn derive_stake_deltas(tx: &ConfirmedTransaction, token_mint: &Pubkey) -> Vec<(Pubkey, AtomsDelta)> {
    let mut indices: BTreeSet<u32> = BTreeSet::new();
    for entry in tx.meta.pre_token_balances.iter().chain(tx.meta.post_token_balances.iter()) {
        if &entry.mint == token_mint {
            indices.insert(entry.account_index);
        }
    }

    let mut deltas = Vec::new();
    for index in indices {
        let pre = balance_at(&tx.meta.pre_token_balances, index, token_mint);
        let post = balance_at(&tx.meta.post_token_balances, index, token_mint);
        let owner = owner_at(&tx.meta.post_token_balances, index, token_mint).or_else(|| owner_at(&tx.meta.pre_token_balances, index, token_mint));

        let Some(owner) = owner else { continue };
        let delta = AtomsDelta::from_pre_post(&pre, &post);
        if delta.is_zero() {
            continue;
        }
        deltas.push((owner, delta));
    }
    deltas
}

fn balance_at(entries: &[TokenBalanceEntry], account_index: u32, mint: &Pubkey) -> Atoms {
    entries
        .iter()
        .find(|e| e.account_index == account_index && &e.mint == mint)
        .and_then(|e| Atoms::parse(&e.ui_token_amount_amount).ok())
        .unwrap_or_else(Atoms::zero)
}

fn owner_at(entries: &[TokenBalanceEntry], account_index: u32, mint: &Pubkey) -> Option<Pubkey> {
    entries.iter().find(|e| e.account_index == account_index && &e.mint == mint).and_then(|e| e.owner.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc::TransactionMeta;
    use types::Signature;

    fn balance(index: u32, mint: &str, owner: &str, amount: &str) -> TokenBalanceEntry {
        TokenBalanceEntry { account_index: index, mint: Pubkey::new_unchecked(mint), owner: Some(Pubkey::new_unchecked(owner)), ui_token_amount_amount: amount.to_string() }
    }

    fn tx(pre: Vec<TokenBalanceEntry>, post: Vec<TokenBalanceEntry>) -> ConfirmedTransaction {
        ConfirmedTransaction {
            signature: Signature::new_unchecked("sig1"),
            slot: 1,
            block_time: Some(1),
            account_keys: Vec::new(),
            instructions: Vec::new(),
            meta: TransactionMeta { log_messages: Vec::new(), pre_token_balances: pre, post_token_balances: post },
        }
    }

    #[test]
    fn balance_decrease_is_a_stake() {
        let mint = Pubkey::new_unchecked("mint");
        let t = tx(vec![balance(0, "mint", "owner1", "1000")], vec![balance(0, "mint", "owner1", "400")]);
        let deltas = derive_stake_deltas(&t, &mint);
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].1.is_negative());
    }

    #[test]
    fn unrelated_mint_is_ignored() {
        let mint = Pubkey::new_unchecked("mint");
        let t = tx(vec![balance(0, "other", "owner1", "1000")], vec![balance(0, "other", "owner1", "400")]);
        assert!(derive_stake_deltas(&t, &mint).is_empty());
    }
}
