//! Process configuration: a TOML file plus environment variable overrides,
//! following the reference monorepo's config idiom (`Default` + `from_toml_*`
//! + `apply_env_overrides` + `validate`).

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Every variable recognized by the process (§6 environment, plus the
/// Postgres DSN and log format carried by the ambient stack).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub rpc_url: String,
    /// Overrides the websocket URL derived from `rpc_url` (http→ws,
    /// https→wss) when the validator serves it on a different host.
    pub ws_url: String,
    pub program_id: String,
    /// Comma-separated pool ids to track when `discover_pools` is false.
    pub pools: Vec<String>,
    pub discover_pools: bool,
    pub discovery_refresh_sec: u64,
    pub pool_cache_ttl_sec: u64,
    pub signature_lookback: u32,
    pub trades_poll_ms: u64,
    pub backfill_max_per_pool: u32,
    pub backfill_page_size: u32,
    pub candles_tick_ms: u64,
    pub candles_flush_ms: u64,
    pub cors_origins: Vec<String>,
    pub ws_ticket_ttl_sec: u64,
    pub database_url: String,
    pub log_format: LogFormat,
    /// §9 open question C.4: whether undecodable transactions are persisted
    /// as a raw `eventType = "tx"` row. Defaults to enabled.
    pub persist_raw_fallback: bool,
    pub stake_program_id: String,
    /// One entry per token-vault stake indexer to run.
    pub token_vaults: Vec<TokenVaultConfig>,
    pub nft_stake_enabled: bool,
    pub stake_signature_lookback: u32,
    pub reconnect_backoff_ms: u64,
    pub fee_vault_debounce_ms: u64,
    pub fee_vault_min_interval_ms: u64,
    /// How often the dedup-set compaction sweep runs (§9 Design Notes).
    pub dedup_compaction_interval_sec: u64,
    /// Slots behind the chain head a dedup entry must fall before it is
    /// eligible for compaction — must stay safely past any reachable
    /// backfill or reorg depth.
    pub dedup_safety_window_slots: u64,
}

/// One token-vault stake indexer's scan target (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenVaultConfig {
    pub vault_id: String,
    pub token_mint: String,
    pub scan_address: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: String::new(),
            program_id: String::new(),
            pools: Vec::new(),
            discover_pools: false,
            discovery_refresh_sec: 300,
            pool_cache_ttl_sec: 12,
            signature_lookback: 200,
            trades_poll_ms: 2_000,
            backfill_max_per_pool: 20_000,
            backfill_page_size: 1_000,
            candles_tick_ms: 250,
            candles_flush_ms: 1_000,
            cors_origins: Vec::new(),
            ws_ticket_ttl_sec: 60,
            database_url: "postgres://localhost/orbit".to_string(),
            log_format: LogFormat::Pretty,
            persist_raw_fallback: true,
            stake_program_id: String::new(),
            token_vaults: Vec::new(),
            nft_stake_enabled: false,
            stake_signature_lookback: 200,
            reconnect_backoff_ms: 2_000,
            fee_vault_debounce_ms: 500,
            fee_vault_min_interval_ms: 5_000,
            dedup_compaction_interval_sec: 60,
            dedup_safety_window_slots: 1_500,
        }
    }
}

impl IndexerConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path:?}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse indexer config TOML")
    }

    /// Load from `path` if it exists, falling back to defaults, then apply
    /// environment variable overrides on top.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_toml_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("RPC_URL") {
            self.rpc_url = v;
        }
        if let Ok(v) = env::var("WS_URL") {
            self.ws_url = v;
        }
        if let Ok(v) = env::var("PROGRAM_ID") {
            self.program_id = v;
        }
        if let Ok(v) = env::var("POOLS") {
            self.pools = split_csv(&v);
        }
        if let Ok(v) = env::var("DISCOVER_POOLS") {
            if let Ok(b) = v.parse() {
                self.discover_pools = b;
            }
        }
        if let Ok(v) = env::var("DISCOVERY_REFRESH_SEC") {
            if let Ok(n) = v.parse() {
                self.discovery_refresh_sec = n;
            }
        }
        if let Ok(v) = env::var("POOL_CACHE_TTL_SEC") {
            if let Ok(n) = v.parse() {
                self.pool_cache_ttl_sec = n;
            }
        }
        if let Ok(v) = env::var("SIGNATURE_LOOKBACK") {
            if let Ok(n) = v.parse() {
                self.signature_lookback = n;
            }
        }
        if let Ok(v) = env::var("TRADES_POLL_MS") {
            if let Ok(n) = v.parse() {
                self.trades_poll_ms = n;
            }
        }
        if let Ok(v) = env::var("BACKFILL_MAX_PER_POOL") {
            if let Ok(n) = v.parse() {
                self.backfill_max_per_pool = n;
            }
        }
        if let Ok(v) = env::var("BACKFILL_PAGE_SIZE") {
            if let Ok(n) = v.parse() {
                self.backfill_page_size = n;
            }
        }
        if let Ok(v) = env::var("CANDLES_TICK_MS") {
            if let Ok(n) = v.parse() {
                self.candles_tick_ms = n;
            }
        }
        if let Ok(v) = env::var("CANDLES_FLUSH_MS") {
            if let Ok(n) = v.parse() {
                self.candles_flush_ms = n;
            }
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.cors_origins = split_csv(&v);
        }
        if let Ok(v) = env::var("WS_TICKET_TTL_SEC") {
            if let Ok(n) = v.parse() {
                self.ws_ticket_ttl_sec = n;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Ok(v) = env::var("LOG_FORMAT") {
            if v.eq_ignore_ascii_case("json") {
                self.log_format = LogFormat::Json;
            } else if v.eq_ignore_ascii_case("pretty") {
                self.log_format = LogFormat::Pretty;
            }
        }
        if let Ok(v) = env::var("PERSIST_RAW_FALLBACK") {
            if let Ok(b) = v.parse() {
                self.persist_raw_fallback = b;
            }
        }
        if let Ok(v) = env::var("STAKE_PROGRAM_ID") {
            self.stake_program_id = v;
        }
        if let Ok(v) = env::var("NFT_STAKE_ENABLED") {
            if let Ok(b) = v.parse() {
                self.nft_stake_enabled = b;
            }
        }
        if let Ok(v) = env::var("STAKE_SIGNATURE_LOOKBACK") {
            if let Ok(n) = v.parse() {
                self.stake_signature_lookback = n;
            }
        }
        if let Ok(v) = env::var("RECONNECT_BACKOFF_MS") {
            if let Ok(n) = v.parse() {
                self.reconnect_backoff_ms = n;
            }
        }
        if let Ok(v) = env::var("FEE_VAULT_DEBOUNCE_MS") {
            if let Ok(n) = v.parse() {
                self.fee_vault_debounce_ms = n;
            }
        }
        if let Ok(v) = env::var("FEE_VAULT_MIN_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.fee_vault_min_interval_ms = n;
            }
        }
        if let Ok(v) = env::var("DEDUP_COMPACTION_INTERVAL_SEC") {
            if let Ok(n) = v.parse() {
                self.dedup_compaction_interval_sec = n;
            }
        }
        if let Ok(v) = env::var("DEDUP_SAFETY_WINDOW_SLOTS") {
            if let Ok(n) = v.parse() {
                self.dedup_safety_window_slots = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            anyhow::bail!("rpc_url must not be empty");
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            anyhow::bail!("rpc_url must start with http:// or https://");
        }
        if self.program_id.is_empty() {
            anyhow::bail!("program_id must not be empty");
        }
        if !self.discover_pools && self.pools.is_empty() {
            anyhow::bail!("pools must be non-empty unless discover_pools is set");
        }
        if self.backfill_page_size == 0 || self.backfill_page_size > 1_000 {
            anyhow::bail!("backfill_page_size must be in 1..=1000");
        }
        if self.trades_poll_ms == 0 || self.candles_tick_ms == 0 || self.candles_flush_ms == 0 {
            anyhow::bail!("poll/tick/flush intervals must be greater than zero");
        }
        if self.database_url.is_empty() {
            anyhow::bail!("database_url must not be empty");
        }
        if (!self.token_vaults.is_empty() || self.nft_stake_enabled) && self.stake_program_id.is_empty() {
            anyhow::bail!("stake_program_id must be set when token_vaults or nft_stake_enabled is used");
        }
        Ok(())
    }

    /// `ws_url` if set, else `rpc_url` with its scheme swapped for the
    /// websocket equivalent.
    pub fn effective_ws_url(&self) -> String {
        if !self.ws_url.is_empty() {
            return self.ws_url.clone();
        }
        if let Some(rest) = self.rpc_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.rpc_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.rpc_url.clone()
        }
    }

    pub fn save_toml_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize indexer config")?;
        std::fs::write(path, content).with_context(|| format!("failed to write config file: {path:?}"))
    }
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_with_program_and_pool_is_valid() {
        let mut config = IndexerConfig::default();
        config.program_id = "Orbit1111111111111111111111111111111111111".to_string();
        config.pools = vec!["Pool1".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_pools_without_discovery_is_invalid() {
        let mut config = IndexerConfig::default();
        config.program_id = "Orbit1111111111111111111111111111111111111".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn discover_pools_relaxes_pool_list_requirement() {
        let mut config = IndexerConfig::default();
        config.program_id = "Orbit1111111111111111111111111111111111111".to_string();
        config.discover_pools = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_take_effect() {
        std::env::set_var("RPC_URL", "https://custom.example.com");
        std::env::set_var("TRADES_POLL_MS", "500");
        std::env::set_var("POOLS", "A, B ,C");
        let mut config = IndexerConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.rpc_url, "https://custom.example.com");
        assert_eq!(config.trades_poll_ms, 500);
        assert_eq!(config.pools, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
        std::env::remove_var("RPC_URL");
        std::env::remove_var("TRADES_POLL_MS");
        std::env::remove_var("POOLS");
    }

    #[test]
    fn ws_url_derives_from_https_rpc_url() {
        let config = IndexerConfig::default();
        assert_eq!(config.effective_ws_url(), "wss://api.mainnet-beta.solana.com");
    }

    #[test]
    fn explicit_ws_url_overrides_derivation() {
        let mut config = IndexerConfig::default();
        config.ws_url = "wss://custom.example.com".to_string();
        assert_eq!(config.effective_ws_url(), "wss://custom.example.com");
    }

    #[test]
    fn round_trips_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indexer.toml");
        let mut config = IndexerConfig::default();
        config.program_id = "Orbit1111111111111111111111111111111111111".to_string();
        config.pools = vec!["Pool1".to_string()];
        config.save_toml_file(&path).unwrap();
        let loaded = IndexerConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded.program_id, config.program_id);
        assert_eq!(loaded.pools, config.pools);
    }
}
