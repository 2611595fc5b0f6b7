//! Reserve Core — Entry Point
//!
//! Initializes configuration, logging, the snapshot stores, the audit
//! log, blockchain and exchange connections, then runs the fetch loop
//! until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create one snapshot store per data domain (configured retention)
//! 4. Open the JSONL activity log behind the metrics decorator
//! 5. Connect the signing RPC provider (RESERVE_PRIVATE_KEY) and check chain ID
//! 6. Create exchange adapters (LIQUI_API_KEY, LIQUI_API_SECRET)
//! 7. Build ReserveCore (writes) and ReserveData (reads)
//! 8. Spawn metrics server, health server and the fetcher
//! 9. Wait for SIGINT → graceful shutdown (stop→drain→flush→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use reserve_core::adapters::activity::JsonlActivityLog;
use reserve_core::adapters::chain::{connect_http, ensure_chain_id, EvmBlockchain};
use reserve_core::adapters::exchange::{Liqui, LiquiAuth, LiquiClientConfig, LiquiHttp};
use reserve_core::adapters::metrics::{
    HealthServer, HealthState, MeteredActivityLog, MetricsRegistry,
};
use reserve_core::adapters::storage::RamSnapshotStore;
use reserve_core::config::{self, AppConfig};
use reserve_core::domain::market::{AllBalances, AllEBalances, AllPrices, AllRates};
use reserve_core::domain::token::{TokenId, TokenRegistry};
use reserve_core::ports::exchange::Exchange;
use reserve_core::usecases::{DataStores, Fetcher, ReserveCore, ReserveData};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::var("RESERVE_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.service.log_level)
            }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        tokens = config.tokens.len(),
        exchanges = config.exchanges.len(),
        "Starting reserve core"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());
    let registry = Arc::new(config.token_registry());

    // ── 3. Snapshot stores, one per domain ──────────────────
    let retention = config.storage.retention;
    let stores = DataStores {
        prices: Arc::new(RamSnapshotStore::<AllPrices>::with_retention("price", retention)),
        ebalances: Arc::new(RamSnapshotStore::<AllEBalances>::with_retention(
            "ebalance", retention,
        )),
        balances: Arc::new(RamSnapshotStore::<AllBalances>::with_retention(
            "balance", retention,
        )),
        rates: Arc::new(RamSnapshotStore::<AllRates>::with_retention("rate", retention)),
    };

    // ── 4. Activity log ─────────────────────────────────────
    let jsonl = JsonlActivityLog::open(&config.activity.data_dir)
        .await
        .context("Failed to open activity log")?;
    let activity = Arc::new(MeteredActivityLog::new(jsonl, Arc::clone(&metrics)));

    // ── 5. Blockchain ───────────────────────────────────────
    let private_key = std::env::var("RESERVE_PRIVATE_KEY")
        .context("RESERVE_PRIVATE_KEY env var not set")?;
    let provider = connect_http(&config.chain.rpc_url, &private_key)?;
    ensure_chain_id::<Http<Client>, _>(&provider, config.chain.chain_id).await?;
    let blockchain = Arc::new(EvmBlockchain::<Http<Client>, _>::new(
        provider,
        config.chain.reserve_address,
        config.chain.pricing_address,
    ));

    // ── 6. Exchanges ────────────────────────────────────────
    let exchanges = build_exchanges(&config, &registry)?;

    // ── 7. Orchestrators ────────────────────────────────────
    let core = ReserveCore::new(
        Arc::clone(&blockchain),
        Arc::clone(&activity),
        config.chain.reserve_manager,
    );
    let data = ReserveData::new(stores.clone(), Arc::clone(&registry));

    // ── 8. Spawn servers and the fetcher ────────────────────
    let metrics_handle = if config.metrics.enabled {
        let shutdown = shutdown_tx.subscribe();
        let metrics = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind, shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let health_shutdown = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    let mut fetcher = Fetcher::new(
        exchanges,
        Arc::clone(&blockchain),
        registry.tokens().cloned().collect(),
        stores,
        Duration::from_millis(config.fetcher.interval_ms),
        shutdown_tx.subscribe(),
    )
    .with_metrics(Arc::clone(&metrics))
    .with_health(Arc::clone(&health));
    let fetcher_handle = tokio::spawn(async move { fetcher.run().await });

    info!(
        reserve_manager = %core.reserve_manager(),
        "Reserve running, fetcher and servers spawned"
    );

    // ── 9. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // 1. Readiness probe → 503
    health.begin_shutdown();

    // 2. Signal all tasks to stop
    let _ = shutdown_tx.send(());

    // 3. Wait for the fetcher to finish its cycle (up to 30s)
    if tokio::time::timeout(Duration::from_secs(30), fetcher_handle)
        .await
        .is_err()
    {
        warn!("Fetcher did not stop within 30s");
    }

    // 4. Drain pending audit records to disk
    if let Err(e) = activity.inner().flush().await {
        error!(error = %e, "Failed to flush activity log");
    }
    match core.get_records().await {
        Ok(records) => info!(records = records.len(), "Activity log flushed"),
        Err(e) => warn!(error = %e, "Failed to read back activity log"),
    }
    info!(
        price_version = ?data.current_price_version().ok(),
        balance_version = ?data.current_balance_version().ok(),
        "Final snapshot versions"
    );

    // 5. Stop servers
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Instantiate one adapter per configured exchange.
fn build_exchanges(
    config: &AppConfig,
    registry: &TokenRegistry,
) -> Result<Vec<Arc<dyn Exchange>>> {
    let mut exchanges: Vec<Arc<dyn Exchange>> = Vec::new();

    for exchange in &config.exchanges {
        let pairs = exchange
            .pairs
            .iter()
            .map(|p| registry.parse_pair(p))
            .collect::<Result<Vec<_>, _>>()?;
        let addresses: HashMap<TokenId, _> = exchange
            .addresses
            .iter()
            .map(|(token, address)| (token.clone(), *address))
            .collect();

        let auth = Arc::new(
            LiquiAuth::from_env().context("Failed to load Liqui credentials from env")?,
        );
        let client_config = LiquiClientConfig {
            base_url: exchange.base_url.clone(),
            timeout: Duration::from_millis(exchange.timeout_ms),
            requests_per_second: exchange.requests_per_second,
            ..Default::default()
        };
        let http = LiquiHttp::new(auth, client_config).context("Failed to create Liqui client")?;

        info!(
            exchange = %exchange.name,
            pairs = pairs.len(),
            deposit_tokens = addresses.len(),
            "Exchange configured"
        );
        exchanges.push(Arc::new(Liqui::new(
            http,
            pairs,
            addresses,
            registry.tokens().cloned().collect(),
        )));
    }

    if exchanges.is_empty() {
        warn!("No exchanges configured, only on-chain balances will be fetched");
    }

    Ok(exchanges)
}
