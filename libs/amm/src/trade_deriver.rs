//! C3: pure derivation of a [`Trade`] from a confirmed transaction's
//! pre/post token-balance deltas against a pool's vaults (§4.2). No event
//! decoding is involved, which keeps the derivation correct even for
//! programs whose events aren't yet decodable.

use rpc::{ConfirmedTransaction, TokenBalanceEntry};
use types::{Atoms, AtomsDelta, Pool, Trade};

/// Derive at most one trade for `pool` from `tx`.
pub fn derive_trade(tx: &ConfirmedTransaction, pool: &Pool) -> Option<Trade> {
    let base_idx = tx.account_index(&pool.base_vault)?;
    let quote_idx = tx.account_index(&pool.quote_vault)?;

    let base_delta = AtomsDelta::from_pre_post(
        &balance_at(&tx.meta.pre_token_balances, base_idx),
        &balance_at(&tx.meta.post_token_balances, base_idx),
    );
    let quote_delta = AtomsDelta::from_pre_post(
        &balance_at(&tx.meta.pre_token_balances, quote_idx),
        &balance_at(&tx.meta.post_token_balances, quote_idx),
    );

    let (in_mint, out_mint, amount_in, amount_out) = if base_delta.is_positive() && quote_delta.is_negative() {
        (pool.base_mint.clone(), pool.quote_mint.clone(), base_delta.magnitude(), quote_delta.magnitude())
    } else if quote_delta.is_positive() && base_delta.is_negative() {
        (pool.quote_mint.clone(), pool.base_mint.clone(), quote_delta.magnitude(), base_delta.magnitude())
    } else {
        return None;
    };

    Some(Trade {
        signature: tx.signature.clone(),
        slot: tx.slot,
        block_time: tx.block_time,
        pool_id: pool.pool_id.clone(),
        user: tx.fee_payer().cloned(),
        in_mint: Some(in_mint),
        out_mint: Some(out_mint),
        amount_in_atoms: Some(amount_in),
        amount_out_atoms: Some(amount_out),
    })
}

/// A vault account index absent from a `pre`/`postTokenBalances` array means
/// it held no balance of that mint before/after the transaction.
fn balance_at(entries: &[TokenBalanceEntry], account_index: usize) -> Atoms {
    entries
        .iter()
        .find(|e| e.account_index as usize == account_index)
        .and_then(|e| Atoms::parse(&e.ui_token_amount_amount).ok())
        .unwrap_or_else(Atoms::zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc::TransactionMeta;
    use types::{Pubkey, Q64_64, Signature};

    fn sample_pool() -> Pool {
        Pool {
            pool_id: Pubkey::new_unchecked("Pool1"),
            base_mint: Pubkey::new_unchecked("AAAA"),
            quote_mint: Pubkey::new_unchecked("BBBB"),
            base_decimals: 9,
            quote_decimals: 6,
            base_vault: Pubkey::new_unchecked("VaultA"),
            quote_vault: Pubkey::new_unchecked("VaultB"),
            lp_mint: None,
            creator_fee_vault: Pubkey::new_unchecked("FeeC"),
            holders_fee_vault: Pubkey::new_unchecked("FeeH"),
            nft_fee_vault: Pubkey::new_unchecked("FeeN"),
            bin_step_bps: 10,
            active_bin: 0,
            price_q64_64: Q64_64::ZERO,
            last_update_slot: 0,
        }
    }

    fn balance(index: u32, mint: &str, amount: &str) -> TokenBalanceEntry {
        TokenBalanceEntry {
            account_index: index,
            mint: Pubkey::new_unchecked(mint),
            owner: None,
            ui_token_amount_amount: amount.to_string(),
        }
    }

    fn tx_with_deltas(pre: Vec<TokenBalanceEntry>, post: Vec<TokenBalanceEntry>) -> ConfirmedTransaction {
        ConfirmedTransaction {
            signature: Signature::new_unchecked("sig1"),
            slot: 100,
            block_time: Some(1_700_000_000),
            account_keys: vec![
                Pubkey::new_unchecked("U1"),
                Pubkey::new_unchecked("VaultA"),
                Pubkey::new_unchecked("VaultB"),
            ],
            instructions: vec![],
            meta: TransactionMeta {
                log_messages: vec!["Program log: Instruction: Swap".to_string()],
                pre_token_balances: pre,
                post_token_balances: post,
            },
        }
    }

    #[test]
    fn base_in_quote_out_swap_s1() {
        let pool = sample_pool();
        let tx = tx_with_deltas(
            vec![balance(1, "AAAA", "100000000000"), balance(2, "BBBB", "1000000000")],
            vec![balance(1, "AAAA", "101000000000"), balance(2, "BBBB", "997000000")],
        );
        let trade = derive_trade(&tx, &pool).expect("swap should derive a trade");
        assert_eq!(trade.user.unwrap().as_str(), "U1");
        assert_eq!(trade.in_mint.unwrap(), pool.base_mint);
        assert_eq!(trade.out_mint.unwrap(), pool.quote_mint);
        assert_eq!(trade.amount_in_atoms.unwrap(), Atoms::parse("1000000000").unwrap());
        assert_eq!(trade.amount_out_atoms.unwrap(), Atoms::parse("3000000").unwrap());
    }

    #[test]
    fn quote_in_base_out_is_symmetric() {
        let pool = sample_pool();
        let tx = tx_with_deltas(
            vec![balance(1, "AAAA", "101000000000"), balance(2, "BBBB", "997000000")],
            vec![balance(1, "AAAA", "100000000000"), balance(2, "BBBB", "1000000000")],
        );
        let trade = derive_trade(&tx, &pool).unwrap();
        assert_eq!(trade.in_mint.unwrap(), pool.quote_mint);
        assert_eq!(trade.out_mint.unwrap(), pool.base_mint);
    }

    #[test]
    fn both_positive_deltas_is_not_a_swap() {
        let pool = sample_pool();
        let tx = tx_with_deltas(
            vec![balance(1, "AAAA", "100"), balance(2, "BBBB", "100")],
            vec![balance(1, "AAAA", "150"), balance(2, "BBBB", "150")],
        );
        assert!(derive_trade(&tx, &pool).is_none());
    }

    #[test]
    fn missing_vault_account_yields_none() {
        let pool = sample_pool();
        let mut tx = tx_with_deltas(vec![], vec![]);
        tx.account_keys = vec![Pubkey::new_unchecked("U1")];
        assert!(derive_trade(&tx, &pool).is_none());
    }

    #[test]
    fn absent_balance_entry_defaults_to_zero() {
        let pool = sample_pool();
        // Vault A had no prior balance entry (implicitly zero) and received funds.
        let tx = tx_with_deltas(vec![balance(2, "BBBB", "1000000000")], vec![
            balance(1, "AAAA", "5000000000"),
            balance(2, "BBBB", "997000000"),
        ]);
        let trade = derive_trade(&tx, &pool).unwrap();
        assert_eq!(trade.amount_in_atoms.unwrap(), Atoms::parse("5000000000").unwrap());
    }
}
