//! The fixed-layout account blob a pool account is stored as (§4.3): an
//! 8-byte discriminator, public-key fields, `Q64.64` price, reserve totals,
//! fee-split basis points, bin step, active bin, and a flags byte.
//!
//! Offsets below are this indexer's own on-disk contract for the pool
//! account (the on-chain program's actual layout is out of scope to
//! reverse-engineer here); what matters is that every field §3's `Pool`
//! needs is recoverable from a single account read.

use types::{Pool, PoolInvariantError, Pubkey, Q64_64};

const DISCRIMINATOR_LEN: usize = 8;
const PUBKEY_LEN: usize = 32;

// Field offsets, in account-blob order.
const BASE_MINT: usize = DISCRIMINATOR_LEN;
const QUOTE_MINT: usize = BASE_MINT + PUBKEY_LEN;
const BASE_VAULT: usize = QUOTE_MINT + PUBKEY_LEN;
const QUOTE_VAULT: usize = BASE_VAULT + PUBKEY_LEN;
const LP_MINT: usize = QUOTE_VAULT + PUBKEY_LEN;
const CREATOR_FEE_VAULT: usize = LP_MINT + PUBKEY_LEN;
const HOLDERS_FEE_VAULT: usize = CREATOR_FEE_VAULT + PUBKEY_LEN;
const NFT_FEE_VAULT: usize = HOLDERS_FEE_VAULT + PUBKEY_LEN;
const PRICE_Q64_64: usize = NFT_FEE_VAULT + PUBKEY_LEN;
const BASE_RESERVE: usize = PRICE_Q64_64 + 16;
const QUOTE_RESERVE: usize = BASE_RESERVE + 8;
const FEE_SPLIT_CREATOR_BPS: usize = QUOTE_RESERVE + 8;
const FEE_SPLIT_HOLDERS_BPS: usize = FEE_SPLIT_CREATOR_BPS + 4;
const FEE_SPLIT_NFT_BPS: usize = FEE_SPLIT_HOLDERS_BPS + 4;
const BIN_STEP_BPS: usize = FEE_SPLIT_NFT_BPS + 4;
const ACTIVE_BIN: usize = BIN_STEP_BPS + 2;
const FLAGS: usize = ACTIVE_BIN + 4;
pub const MIN_POOL_ACCOUNT_LEN: usize = FLAGS + 1;

#[derive(Debug)]
pub struct ParsedPoolAccount {
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub lp_mint: Option<Pubkey>,
    pub creator_fee_vault: Pubkey,
    pub holders_fee_vault: Pubkey,
    pub nft_fee_vault: Pubkey,
    pub price_q64_64: Q64_64,
    pub bin_step_bps: u16,
    pub active_bin: i32,
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::from_bytes(&bytes)
}

fn is_zero_pubkey(data: &[u8], offset: usize) -> bool {
    data[offset..offset + 32].iter().all(|b| *b == 0)
}

pub fn parse_pool_account(data: &[u8]) -> Result<ParsedPoolAccount, &'static str> {
    if data.len() < MIN_POOL_ACCOUNT_LEN {
        return Err("account too short for pool layout");
    }

    let mut price_bytes = [0u8; 16];
    price_bytes.copy_from_slice(&data[PRICE_Q64_64..PRICE_Q64_64 + 16]);
    let price_raw = u128::from_le_bytes(price_bytes);

    let mut bin_step_bytes = [0u8; 2];
    bin_step_bytes.copy_from_slice(&data[BIN_STEP_BPS..BIN_STEP_BPS + 2]);

    let mut active_bin_bytes = [0u8; 4];
    active_bin_bytes.copy_from_slice(&data[ACTIVE_BIN..ACTIVE_BIN + 4]);

    Ok(ParsedPoolAccount {
        base_mint: read_pubkey(data, BASE_MINT),
        quote_mint: read_pubkey(data, QUOTE_MINT),
        base_vault: read_pubkey(data, BASE_VAULT),
        quote_vault: read_pubkey(data, QUOTE_VAULT),
        lp_mint: if is_zero_pubkey(data, LP_MINT) { None } else { Some(read_pubkey(data, LP_MINT)) },
        creator_fee_vault: read_pubkey(data, CREATOR_FEE_VAULT),
        holders_fee_vault: read_pubkey(data, HOLDERS_FEE_VAULT),
        nft_fee_vault: read_pubkey(data, NFT_FEE_VAULT),
        price_q64_64: Q64_64::from_raw(price_raw),
        bin_step_bps: u16::from_le_bytes(bin_step_bytes),
        active_bin: i32::from_le_bytes(active_bin_bytes),
    })
}

/// SPL mint account layout: `decimals` sits at byte offset 44 (past
/// `COption<Pubkey>` mint authority + `u64` supply).
const MINT_DECIMALS_OFFSET: usize = 44;

pub fn parse_mint_decimals(data: &[u8]) -> Option<u8> {
    data.get(MINT_DECIMALS_OFFSET).copied()
}

pub fn build_pool(pool_id: Pubkey, parsed: ParsedPoolAccount, base_decimals: u8, quote_decimals: u8, slot: u64) -> Result<Pool, PoolInvariantError> {
    let pool = Pool {
        pool_id,
        base_mint: parsed.base_mint,
        quote_mint: parsed.quote_mint,
        base_decimals,
        quote_decimals,
        base_vault: parsed.base_vault,
        quote_vault: parsed.quote_vault,
        lp_mint: parsed.lp_mint,
        creator_fee_vault: parsed.creator_fee_vault,
        holders_fee_vault: parsed.holders_fee_vault,
        nft_fee_vault: parsed.nft_fee_vault,
        bin_step_bps: parsed.bin_step_bps,
        active_bin: parsed.active_bin,
        price_q64_64: parsed.price_q64_64,
        last_update_slot: slot,
    };
    pool.validate()?;
    Ok(pool)
}

/// Assembles a well-formed pool blob for tests elsewhere in this crate.
#[cfg(test)]
pub(crate) fn sample_blob() -> Vec<u8> {
    let mut data = vec![0u8; MIN_POOL_ACCOUNT_LEN];
    data[BASE_MINT..BASE_MINT + 32].copy_from_slice(&[1u8; 32]);
    data[QUOTE_MINT..QUOTE_MINT + 32].copy_from_slice(&[2u8; 32]);
    data[BASE_VAULT..BASE_VAULT + 32].copy_from_slice(&[3u8; 32]);
    data[QUOTE_VAULT..QUOTE_VAULT + 32].copy_from_slice(&[4u8; 32]);
    data[PRICE_Q64_64..PRICE_Q64_64 + 16].copy_from_slice(&(Q64_64::ONE.0.to_le_bytes()));
    data[BIN_STEP_BPS..BIN_STEP_BPS + 2].copy_from_slice(&10u16.to_le_bytes());
    data[ACTIVE_BIN..ACTIVE_BIN + 4].copy_from_slice(&5i32.to_le_bytes());
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pubkeys_and_price() {
        let parsed = parse_pool_account(&sample_blob()).unwrap();
        assert_eq!(parsed.price_q64_64, Q64_64::ONE);
        assert_eq!(parsed.bin_step_bps, 10);
        assert_eq!(parsed.active_bin, 5);
        assert!(parsed.lp_mint.is_none());
    }

    #[test]
    fn rejects_short_account() {
        assert!(parse_pool_account(&[0u8; 10]).is_err());
    }

    #[test]
    fn nonzero_lp_mint_is_some() {
        let mut blob = sample_blob();
        blob[LP_MINT] = 9;
        let parsed = parse_pool_account(&blob).unwrap();
        assert!(parsed.lp_mint.is_some());
    }
}
