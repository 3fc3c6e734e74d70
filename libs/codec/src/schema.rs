//! Declarative field layouts for the small set of known event names.
//!
//! Without a compiled IDL, the decoder can't discover field layouts on its
//! own; we register the handful of event shapes the Ingestion Engine and
//! stake indexers actually need fields from (everything else is persisted
//! as an opaque blob, never decoded field-by-field). Each schema is a
//! sequence of fixed-width primitives read in declaration order — the same
//! layout Anchor's `#[event]` macro produces for these field types.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    U128,
    I64,
    Bool,
    Pubkey,
}

impl FieldType {
    pub fn width(self) -> usize {
        match self {
            FieldType::U8 | FieldType::Bool => 1,
            FieldType::U16 => 2,
            FieldType::U32 => 4,
            FieldType::U64 | FieldType::I64 => 8,
            FieldType::U128 => 16,
            FieldType::Pubkey => 32,
        }
    }
}

pub type EventSchema = &'static [(&'static str, FieldType)];

pub static KNOWN_EVENTS: Lazy<HashMap<&'static str, EventSchema>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, EventSchema> = HashMap::new();
    m.insert(
        "SwapExecuted",
        &[
            ("pool", FieldType::Pubkey),
            ("user", FieldType::Pubkey),
            ("amount_in", FieldType::U64),
            ("amount_out", FieldType::U64),
            ("active_bin", FieldType::U32),
        ],
    );
    m.insert(
        "LiquidityDeposited",
        &[
            ("pool", FieldType::Pubkey),
            ("user", FieldType::Pubkey),
            ("amount_base", FieldType::U64),
            ("amount_quote", FieldType::U64),
        ],
    );
    m.insert(
        "LiquidityWithdrawn",
        &[
            ("pool", FieldType::Pubkey),
            ("user", FieldType::Pubkey),
            ("amount_base", FieldType::U64),
            ("amount_quote", FieldType::U64),
        ],
    );
    m.insert(
        "FeesDistributed",
        &[
            ("pool", FieldType::Pubkey),
            ("creator_amount", FieldType::U64),
            ("holders_amount", FieldType::U64),
            ("nft_amount", FieldType::U64),
        ],
    );
    m.insert(
        "PoolInitialized",
        &[
            ("pool", FieldType::Pubkey),
            ("base_mint", FieldType::Pubkey),
            ("quote_mint", FieldType::Pubkey),
            ("bin_step_bps", FieldType::U16),
        ],
    );
    m.insert(
        "NftStaked",
        &[
            ("nft_mint", FieldType::Pubkey),
            ("owner", FieldType::Pubkey),
            ("lock_duration_sec", FieldType::I64),
        ],
    );
    m.insert(
        "NftUnstaked",
        &[("nft_mint", FieldType::Pubkey), ("owner", FieldType::Pubkey)],
    );
    m
});
