//! Futarchy Price Feed - Main Entry Point
//!
//! Polls a YES/NO conditional market on Gnosis Chain and logs prices, impact and probability

use futarchy_price_feed::*;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{debug, error, info, warn};
use futarchy_price_feed::fetchers::{ProposalStatus, RpcPoolFetcher, SupabaseConfig, SupabasePoolFetcher};
use futarchy_price_feed::network::AlloyPoolSource;
use futarchy_price_feed::utils::LoggingOptions;

// Cycles between the slower side queries
const PROPOSAL_STATUS_EVERY: u64 = 4;
const HEALTH_CHECK_EVERY: u64 = 8;
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = CONFIG.clone();

    // Initialize logging
    let _logging_guard = utils::setup_logging(&LoggingOptions {
        json_file: config.log_json,
        ..LoggingOptions::default()
    })?;

    info!("🔮 Futarchy Price Feed v0.3.0 - Conditional Market Monitor");
    info!("📋 Configuration:");
    info!("   Network: {}", config.network);
    info!("   RPC endpoints: {}", config.rpc_urls.len());
    info!("   Cache TTL: {}s", config.cache_duration_secs);
    info!(
        "   Cooldown: {}s + {}-{}s jitter (at most {:?})",
        config.cooldown_base_secs,
        config.cooldown_jitter_min_secs,
        config.cooldown_jitter_max_secs,
        config.cooldown_policy().max_cooldown()
    );
    info!("   Attempts per read: {}", config.max_rpc_attempts);
    info!("   Serve stale on error: {}", config.serve_stale_on_error);
    info!("   Poll interval: {}s", config.poll_interval_secs);
    info!("   Supabase: {}", if config.supabase_enabled() { "enabled" } else { "disabled" });

    // Setup network access
    let source = Arc::new(AlloyPoolSource::new());
    let reachable = source.probe_endpoints(&config.rpc_urls, PROBE_TIMEOUT).await;
    if reachable == 0 {
        warn!("⚠️ No RPC endpoint answered the probe; reads will keep rotating");
    } else {
        info!("✅ {}/{} RPC endpoints reachable", reachable, config.rpc_urls.len());
    }

    let reader = PoolPriceReader::new(source, config.rpc_urls.clone(), config.reader_config());

    // Register fetchers
    let mut data_layer = DataLayer::new();
    data_layer.register(Arc::new(RpcPoolFetcher::new(reader.clone(), config.serve_stale_on_error)));

    if let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_anon_key) {
        let mut supabase = SupabaseConfig::new(url.clone(), key.clone());
        supabase.candle_interval_ms = config.candle_interval_ms;
        supabase.candle_ttl = Duration::from_secs(config.cache_duration_secs);
        data_layer.register(Arc::new(SupabasePoolFetcher::new(supabase)?));
    }

    let missing = data_layer.missing_operations();
    if !missing.is_empty() {
        info!("   Operations without a fetcher: {:?}", missing);
    }

    let market = market_from_config(&config)?;
    match &market {
        Some(market) => info!(
            "🎯 Market: YES pool {} | NO pool {}",
            market.yes_pool.address, market.no_pool.address
        ),
        None => warn!("⚠️ YES/NO pools not configured; monitoring endpoint health only"),
    }

    // Setup monitoring state
    let start_time = Instant::now();
    let mut monitoring_state = MonitoringState::new();

    // Setup shutdown handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    let shutdown_tx = Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx)));

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("\n📛 Received shutdown signal (Ctrl+C)...");
        if let Some(tx) = shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    });

    info!("\n🚀 Starting main monitoring loop...\n");

    let mut interval = time::interval(config.poll_interval());

    // Main monitoring loop
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_monitoring_cycle(
                    &data_layer,
                    &reader,
                    market.as_ref(),
                    &config,
                    &mut monitoring_state,
                    start_time,
                ).await {
                    error!("Monitoring cycle error: {:#}", e);
                    *monitoring_state.error_counts.entry("cycle".to_string()).or_insert(0) += 1;
                }
            }
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, exiting main loop...");
                break;
            }
        }
    }

    print_final_statistics(start_time, &monitoring_state);

    Ok(())
}

/// Monitoring state to track statistics
struct MonitoringState {
    cycles: u64,
    snapshots: u64,
    stale_snapshots: u64,
    incomplete_snapshots: u64,
    error_counts: HashMap<String, u32>,
    last_snapshot: Option<MarketSnapshot>,
    last_proposal_status: Option<String>,
}

impl MonitoringState {
    fn new() -> Self {
        Self {
            cycles: 0,
            snapshots: 0,
            stale_snapshots: 0,
            incomplete_snapshots: 0,
            error_counts: HashMap::new(),
            last_snapshot: None,
            last_proposal_status: None,
        }
    }

    fn record_error(&mut self, key: &str) {
        *self.error_counts.entry(key.to_string()).or_insert(0) += 1;
    }
}

fn parse_address(value: &str, name: &str) -> Result<Address> {
    value
        .parse()
        .with_context(|| format!("{} is not a valid address: {}", name, value))
}

/// YES/NO pool bindings from the environment. All four values are required together.
fn market_from_config(config: &Config) -> Result<Option<MarketPools>> {
    let (Some(yes), Some(no), Some(token_yes), Some(token_no)) = (
        &config.yes_pool_address,
        &config.no_pool_address,
        &config.company_token_yes,
        &config.company_token_no,
    ) else {
        return Ok(None);
    };

    Ok(Some(MarketPools {
        yes_pool: PoolBinding {
            address: parse_address(yes, "YES_POOL_ADDRESS")?,
            company_token: token_yes.clone(),
            kind: config.pool_kind,
        },
        no_pool: PoolBinding {
            address: parse_address(no, "NO_POOL_ADDRESS")?,
            company_token: token_no.clone(),
            kind: config.pool_kind,
        },
    }))
}

/// Run a single monitoring cycle
async fn run_monitoring_cycle(
    data_layer: &DataLayer,
    reader: &PoolPriceReader,
    market: Option<&MarketPools>,
    config: &Config,
    state: &mut MonitoringState,
    start_time: Instant,
) -> Result<()> {
    state.cycles += 1;

    // Periodic health check
    if state.cycles % HEALTH_CHECK_EVERY == 1 {
        let health = utils::run_health_check(reader, start_time);
        utils::print_health_status(&health);
        if health.endpoints_cooling > 0 {
            utils::print_endpoint_health(&reader.endpoint_health());
        }
        if !state.error_counts.is_empty() {
            debug!("Error summary: {:?}", state.error_counts);
        }
    }

    let Some(market) = market else {
        return Ok(());
    };

    let params = serde_json::to_value(market).context("Failed to encode market parameters")?;
    match data_layer.fetch(OperationKind::MarketSummary, &params).await {
        FetchResponse::Success { data } => record_snapshot(data, state)?,
        FetchResponse::Error { reason } => {
            warn!("⚠️ Market summary unavailable: {}", reason);
            state.record_error("market_summary");
        }
    }

    if data_layer.handles(OperationKind::PoolCandle) {
        let params = json!({ "address": market.yes_pool.address.to_string() });
        match data_layer.fetch(OperationKind::PoolCandle, &params).await {
            FetchResponse::Success { data: Value::Null } => debug!("No YES candle recorded yet"),
            FetchResponse::Success { data } => {
                let candle_price = data.get("price").and_then(Value::as_f64);
                let live_price = state.last_snapshot.as_ref().and_then(|s| s.yes_price);
                info!(
                    "🕯️ YES candle: {} | live: {}",
                    utils::format_price(candle_price, 4),
                    utils::format_price(live_price, 4)
                );
            }
            FetchResponse::Error { reason } => {
                warn!("⚠️ Candle unavailable: {}", reason);
                state.record_error("pool_candle");
            }
        }
    }

    if let Some(proposal_id) = &config.proposal_id {
        if state.cycles % PROPOSAL_STATUS_EVERY == 1 && data_layer.handles(OperationKind::ProposalStatus) {
            let params = json!({ "proposal_id": proposal_id });
            match data_layer.fetch(OperationKind::ProposalStatus, &params).await {
                FetchResponse::Success { data } => {
                    let proposal: Option<ProposalStatus> =
                        serde_json::from_value(data).context("Unexpected proposal status payload")?;
                    report_proposal(proposal_id, proposal, state);
                }
                FetchResponse::Error { reason } => {
                    warn!("⚠️ Proposal status unavailable: {}", reason);
                    state.record_error("proposal_status");
                }
            }
        }
    }

    Ok(())
}

fn record_snapshot(data: Value, state: &mut MonitoringState) -> Result<()> {
    let snapshot: MarketSnapshot =
        serde_json::from_value(data).context("Unexpected market summary payload")?;

    state.snapshots += 1;
    if snapshot.stale {
        state.stale_snapshots += 1;
    }
    if snapshot.yes_price.is_none() || snapshot.no_price.is_none() {
        state.incomplete_snapshots += 1;
    }

    utils::print_market_snapshot("Market", &snapshot);
    state.last_snapshot = Some(snapshot);
    Ok(())
}

fn report_proposal(proposal_id: &str, proposal: Option<ProposalStatus>, state: &mut MonitoringState) {
    let Some(proposal) = proposal else {
        warn!("⚠️ Proposal {} not found", proposal_id);
        return;
    };

    let status = proposal.status.unwrap_or_else(|| utils::NOT_AVAILABLE.to_string());
    if state.last_proposal_status.as_deref() != Some(status.as_str()) {
        info!(
            "📜 Proposal {} ({}): {}",
            proposal.id,
            proposal.title.as_deref().unwrap_or(utils::NOT_AVAILABLE),
            status
        );
        state.last_proposal_status = Some(status);
    }
}

/// Print final statistics on shutdown
fn print_final_statistics(start_time: Instant, state: &MonitoringState) {
    info!("\n🛑 Shutting down gracefully...");
    info!("Final statistics:");
    info!("   Total runtime: {:?}", start_time.elapsed());
    info!("   Monitoring cycles: {}", state.cycles);
    info!("   Market snapshots: {}", state.snapshots);
    info!("   Stale snapshots: {}", state.stale_snapshots);
    info!("   Incomplete snapshots: {}", state.incomplete_snapshots);
    if let Some(snapshot) = &state.last_snapshot {
        utils::print_market_snapshot("Last", snapshot);
    }
    info!("   Total errors: {:?}", state.error_counts);
}
