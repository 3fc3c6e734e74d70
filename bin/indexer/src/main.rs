//! Process entry point: loads configuration, wires the RPC client,
//! persistence pool and every worker (C1-C13) together, and runs until
//! ctrl-c.

mod health;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aggregators::{CandleAggregator, FeeVaultRefresher, VolumeAggregator};
use anyhow::{Context, Result};
use clap::Parser;
use config::{IndexerConfig, LogFormat};
use dashmap::DashSet;
use ingestion::{BackfillDriver, IngestionEngine, PollDriver, SubscribeDriver, SwapClassifierConfig, TradeStore};
use metrics::Metrics;
use pool_reader::PoolReader;
use rpc::{HttpRpcClient, RpcClient};
use serde_json::Value;
use sqlx::PgPool;
use stake_indexers::{NftStakeIndexer, TokenVaultIndexer};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use types::{Pool, Pubkey};
use ws_hub::{HubSettings, OutboundFrame, SnapshotSource, WsHub};

use health::HealthRegistry;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the TOML config file. Missing file falls back to defaults
    /// plus environment overrides.
    #[arg(long, default_value = "indexer.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = IndexerConfig::load(&args.config).context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    init_tracing(config.log_format);

    info!(rpc_url = %config.rpc_url, program_id = %config.program_id, "starting indexer");

    let rpc: Arc<dyn RpcClient> = Arc::new(HttpRpcClient::new(config.rpc_url.clone(), Some(config.effective_ws_url())));
    let db = persistence::connect(&config.database_url, 10).await.context("failed to connect to database")?;
    let pool_reader = Arc::new(PoolReader::new(rpc.clone(), Duration::from_secs(config.pool_cache_ttl_sec)));
    let metrics = Arc::new(Metrics::new());
    let trade_store = Arc::new(TradeStore::new());
    let health = HealthRegistry::new();
    let root_token = CancellationToken::new();

    let (trade_tx, _) = broadcast::channel(1024);
    let (event_tx, _) = broadcast::channel(1024);

    let program_id = Pubkey::new_unchecked(config.program_id.as_str());
    let engine = Arc::new(IngestionEngine::new(
        rpc.clone(),
        pool_reader.clone(),
        db.clone(),
        trade_store.clone(),
        program_id.clone(),
        SwapClassifierConfig::default(),
        config.persist_raw_fallback,
        trade_tx,
        event_tx,
        metrics.clone(),
    ));

    let known_pools: Arc<DashSet<String>> = Arc::new(DashSet::new());
    for pool_id in &config.pools {
        spawn_pool_workers(Pubkey::new_unchecked(pool_id.as_str()), &config, &rpc, &engine, &pool_reader, &db, &metrics, &health, &root_token).await;
        known_pools.insert(pool_id.clone());
    }

    if config.discover_pools {
        spawn_discovery(config.clone(), rpc.clone(), engine.clone(), pool_reader.clone(), db.clone(), metrics.clone(), health.clone(), known_pools, root_token.clone());
    }

    spawn_stake_indexers(&config, &rpc, &db, &metrics, &health, &root_token);

    let compaction_handle = tokio::spawn(spawn_dedup_compaction(
        rpc.clone(),
        trade_store.clone(),
        Duration::from_secs(config.dedup_compaction_interval_sec),
        config.dedup_safety_window_slots,
        root_token.clone(),
    ));
    health.register("dedup:compaction", compaction_handle);

    let hub = Arc::new(WsHub::new(
        HubSettings { cors_origins: config.cors_origins.clone(), ticket_ttl_sec: config.ws_ticket_ttl_sec, ..HubSettings::default() },
        config.program_id.clone(),
    ));
    spawn_hub_fanout(&engine, &hub, &health, &root_token);
    let snapshots: Arc<dyn SnapshotSource> = Arc::new(DbSnapshotSource { db: db.clone() });
    let hub_for_serve = hub.clone();
    let serve_handle = tokio::spawn(async move {
        if let Err(e) = hub_for_serve.serve(snapshots).await {
            error!(error = %e, "ws hub server exited");
        }
    });
    health.register("ws-hub:serve", serve_handle);

    let sweep_handle = tokio::spawn(health.clone().run(Duration::from_secs(15), root_token.clone()));
    health.register("health:sweep", sweep_handle);

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown signal received, cancelling workers");
    root_token.cancel();
    tokio::time::sleep(Duration::from_secs(2)).await;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn spawn_pool_workers(
    pool_id: Pubkey,
    config: &IndexerConfig,
    rpc: &Arc<dyn RpcClient>,
    engine: &Arc<IngestionEngine>,
    pool_reader: &Arc<PoolReader>,
    db: &PgPool,
    metrics: &Arc<Metrics>,
    health: &Arc<HealthRegistry>,
    token: &CancellationToken,
) {
    let pool = match pool_reader.read_pool(&pool_id).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(pool = %pool_id, error = %e, "failed to resolve pool account, skipping");
            return;
        }
    };

    if let Ok(mut conn) = db.acquire().await {
        if let Err(e) = persistence::pools::upsert_pool_static(&mut conn, &config.program_id, &pool).await {
            warn!(pool = %pool_id, error = %e, "failed to persist pool static metadata");
        }
    }

    let program_id = Pubkey::new_unchecked(config.program_id.as_str());

    let poll = PollDriver::new(rpc.clone(), engine.clone(), pool_id.clone(), program_id.clone(), Duration::from_millis(config.trades_poll_ms), config.backfill_page_size);
    let poll_handle = tokio::spawn(poll.run(token.clone()));
    health.register(format!("poll:{pool_id}"), poll_handle);

    let subscribe = SubscribeDriver::new(
        rpc.clone(),
        engine.clone(),
        pool_id.clone(),
        program_id.clone(),
        Duration::from_millis(config.reconnect_backoff_ms),
        metrics.clone(),
    );
    let subscribe_handle = tokio::spawn(subscribe.run(token.clone()));
    health.register(format!("subscribe:{pool_id}"), subscribe_handle);

    let backfill = BackfillDriver::new(rpc.clone(), engine.clone(), pool_id.clone(), program_id.clone(), config.backfill_page_size, config.backfill_max_per_pool);
    let backfill_pool_id = pool_id.clone();
    tokio::spawn(async move {
        match backfill.run(0).await {
            Ok(processed) => info!(pool = %backfill_pool_id, processed, "backfill complete"),
            Err(e) => warn!(pool = %backfill_pool_id, error = %e, "backfill failed"),
        }
    });

    spawn_aggregators(pool, config, rpc, pool_reader, db, engine, health, token);
}

fn spawn_aggregators(
    pool: Pool,
    config: &IndexerConfig,
    rpc: &Arc<dyn RpcClient>,
    pool_reader: &Arc<PoolReader>,
    db: &PgPool,
    engine: &Arc<IngestionEngine>,
    health: &Arc<HealthRegistry>,
    token: &CancellationToken,
) {
    let pool_id = pool.pool_id.clone();

    let candles = Arc::new(CandleAggregator::new(pool.clone(), db.clone()));
    let candle_handle = tokio::spawn(candles.run(engine.subscribe_trades(), Duration::from_millis(config.candles_flush_ms), token.clone()));
    health.register(format!("candles:{pool_id}"), candle_handle);

    let volume = VolumeAggregator::new(pool.clone());
    let volume_handle = tokio::spawn(volume.run(engine.subscribe_trades(), Duration::from_millis(config.candles_tick_ms), token.clone()));
    health.register(format!("volume:{pool_id}"), volume_handle);

    let fees = FeeVaultRefresher::new(
        pool,
        rpc.clone(),
        pool_reader.clone(),
        db.clone(),
        Duration::from_millis(config.fee_vault_debounce_ms),
        Duration::from_millis(config.fee_vault_min_interval_ms),
    );
    let fees_handle = tokio::spawn(fees.run(engine.subscribe_trades(), token.clone()));
    health.register(format!("fees:{pool_id}"), fees_handle);
}

/// Discovery mode (§C.5): periodically scans every account owned by the
/// program with the pool account's fixed length and spawns the full worker
/// bundle for any pool id not already tracked.
#[allow(clippy::too_many_arguments)]
fn spawn_discovery(
    config: IndexerConfig,
    rpc: Arc<dyn RpcClient>,
    engine: Arc<IngestionEngine>,
    pool_reader: Arc<PoolReader>,
    db: PgPool,
    metrics: Arc<Metrics>,
    health: Arc<HealthRegistry>,
    known_pools: Arc<DashSet<String>>,
    token: CancellationToken,
) {
    let program_id = Pubkey::new_unchecked(config.program_id.as_str());
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.discovery_refresh_sec));
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let accounts = match rpc.get_program_accounts(&program_id, pool_reader::layout::MIN_POOL_ACCOUNT_LEN).await {
                Ok(accounts) => accounts,
                Err(e) => {
                    warn!(error = %e, "pool discovery scan failed");
                    continue;
                }
            };

            for (pubkey, _data) in accounts {
                if known_pools.insert(pubkey.to_string()) {
                    info!(pool = %pubkey, "discovered new pool");
                    spawn_pool_workers(pubkey, &config, &rpc, &engine, &pool_reader, &db, &metrics, &health, &token).await;
                }
            }
        }
    });
    health.register("discovery", handle);
}

fn spawn_stake_indexers(config: &IndexerConfig, rpc: &Arc<dyn RpcClient>, db: &PgPool, metrics: &Arc<Metrics>, health: &Arc<HealthRegistry>, token: &CancellationToken) {
    if config.stake_program_id.is_empty() {
        return;
    }
    let stake_program = Pubkey::new_unchecked(config.stake_program_id.as_str());
    let reconnect_backoff = Duration::from_millis(config.reconnect_backoff_ms);

    let compaction_interval = Duration::from_secs(config.dedup_compaction_interval_sec);
    for vault in &config.token_vaults {
        let indexer = TokenVaultIndexer::new(
            rpc.clone(),
            db.clone(),
            stake_program.clone(),
            config.stake_signature_lookback,
            reconnect_backoff,
            metrics.clone(),
            compaction_interval,
            config.dedup_safety_window_slots,
        );
        let vault_id = Pubkey::new_unchecked(vault.vault_id.as_str());
        let token_mint = Pubkey::new_unchecked(vault.token_mint.as_str());
        let scan_address = Pubkey::new_unchecked(vault.scan_address.as_str());
        let decimals = vault.decimals;
        let label = format!("stake-vault:{}", vault.vault_id);
        let token = token.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = indexer.run(vault_id, token_mint, scan_address, decimals, token).await {
                error!(error = %e, "token vault indexer exited");
            }
        });
        health.register(label, handle);
    }

    if config.nft_stake_enabled {
        let indexer = NftStakeIndexer::new(rpc.clone(), db.clone(), stake_program, reconnect_backoff, metrics.clone());
        let token = token.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = indexer.run(token).await {
                error!(error = %e, "nft stake indexer exited");
            }
        });
        health.register("stake-nft", handle);
    }
}

/// Periodically discards dedup-set entries older than `chainHead -
/// safety_window_slots` (§9 Design Notes) so the ingestion engine's shared
/// dedup set doesn't grow for the life of the process.
async fn spawn_dedup_compaction(rpc: Arc<dyn RpcClient>, trade_store: Arc<TradeStore>, interval_duration: Duration, safety_window_slots: u64, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval_duration);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match rpc.get_slot().await {
            Ok(slot) => {
                let below = slot.saturating_sub(safety_window_slots);
                trade_store.compact_dedup(below);
            }
            Err(e) => warn!(error = %e, "failed to fetch current slot for dedup compaction"),
        }
    }
}

fn spawn_hub_fanout(engine: &Arc<IngestionEngine>, hub: &Arc<WsHub>, health: &Arc<HealthRegistry>, token: &CancellationToken) {
    let mut trades = engine.subscribe_trades();
    let trade_hub = hub.clone();
    let trade_token = token.clone();
    let trade_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = trade_token.cancelled() => return,
                trade = trades.recv() => {
                    match trade {
                        Ok(trade) => {
                            let pool = trade.pool_id.to_string();
                            let data = serde_json::to_value(&trade).unwrap_or(Value::Null);
                            trade_hub.publish(OutboundFrame::Trade { pool, data }).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "ws hub trade fanout lagged behind trade broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    });
    health.register("ws-hub:trades", trade_handle);

    let mut events = engine.subscribe_events();
    let event_hub = hub.clone();
    let event_token = token.clone();
    let event_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = event_token.cancelled() => return,
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            let data = serde_json::to_value(&event).unwrap_or(Value::Null);
                            event_hub.publish(OutboundFrame::Event { pool: None, data }).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "ws hub event fanout lagged behind event broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    });
    health.register("ws-hub:events", event_handle);
}

struct DbSnapshotSource {
    db: PgPool,
}

impl SnapshotSource for DbSnapshotSource {
    fn recent_trades(&self, pool: &str, limit: usize) -> Vec<Value> {
        let db = self.db.clone();
        let pool = pool.to_string();
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut conn = match db.acquire().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to acquire db connection for snapshot");
                        return Vec::new();
                    }
                };
                match persistence::trades::get_recent_trades(&mut conn, &pool, limit as i64).await {
                    Ok(rows) => rows.iter().filter_map(|row| serde_json::to_value(row).ok()).collect(),
                    Err(e) => {
                        warn!(error = %e, "failed to read recent trades for snapshot");
                        Vec::new()
                    }
                }
            })
        })
    }
}
