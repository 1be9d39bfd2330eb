// =============================================================================
// QuantView Market Backend — Main Entry Point
// =============================================================================
//
// Polls the exchange's public market-data endpoints for one trading pair and
// serves the aggregated view (order-book depth curves, OHLC candles, signed
// volume) to the chart frontend over REST and WebSocket.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod bittrex;
mod market;
mod refresh;
mod runtime_config;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;

/// Where the runtime config is loaded from and saved to.
pub const CONFIG_PATH: &str = "quantview_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("QuantView market backend starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override the market pair from env if available.
    if let Ok(market) = std::env::var("QUANTVIEW_MARKET") {
        let market = market.trim().to_uppercase();
        if !market.is_empty() {
            config.market = market;
        }
    }

    info!(
        market = %config.market,
        refresh_interval_secs = config.refresh_interval_secs,
        auto_refresh = config.auto_refresh,
        "configured"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr =
        std::env::var("QUANTVIEW_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    // ── 4. Initial refresh, then the periodic loop ───────────────────────
    refresh::refresh_once(&state).await;

    let loop_state = state.clone();
    tokio::spawn(async move {
        refresh::run_refresh_loop(loop_state).await;
    });

    info!("all subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "failed to save config on shutdown");
    }

    info!("QuantView shut down complete.");
    Ok(())
}
