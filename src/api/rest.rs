// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Everything served here is public
// market data, so there is no authentication layer. CORS is configured
// permissively for development; tighten `allowed_origins` in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::refresh::refresh_once;

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/snapshot", get(snapshot))
        .route("/api/v1/depth", get(depth))
        .route("/api/v1/chart", get(chart))
        .route("/api/v1/refresh", post(refresh_now))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config", post(set_config))
        // ── WebSocket (handled in the ws module but mounted here) ────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "market": state.runtime_config.read().market,
        "state_version": state.market.current_version(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "server_time": chrono::Utc::now().timestamp_millis(),
    }))
}

// =============================================================================
// Market view
// =============================================================================

/// Full market snapshot: book, depth curves, OHLC, volume, last price.
async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.market.snapshot();
    let errors = state.recent_errors.read().clone();
    Json(json!({
        "market": state.runtime_config.read().market,
        "snapshot": snap,
        "recent_errors": errors,
    }))
}

/// Depth curves only — the depth chart's payload.
async fn depth(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.market.snapshot();
    Json(json!({
        "bid_depth": snap.bid_depth,
        "ask_depth": snap.ask_depth,
        "book_updated_at": snap.book_updated_at,
    }))
}

/// Candlestick + volume payload for the price chart.
async fn chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.market.snapshot();
    Json(json!({
        "ohlc": snap.ohlc,
        "volume": snap.volume,
        "last_price": snap.last_price,
        "price_direction": snap.price_direction,
        "history_updated_at": snap.history_updated_at,
    }))
}

// =============================================================================
// Manual refresh
// =============================================================================

/// Run a full refresh cycle now, regardless of the auto-refresh setting.
async fn refresh_now(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("manual refresh requested via API");
    let report = refresh_once(&state).await;
    Json(report)
}

// =============================================================================
// Config
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.runtime_config.read().clone())
}

#[derive(Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    auto_refresh: Option<bool>,
}

/// Update the watched market and/or the auto-refresh toggle.
///
/// A market change clears the store so the old pair's aggregates are never
/// served under the new pair's name; the next cycle repopulates it.
async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let mut market_changed = false;

    {
        let mut config = state.runtime_config.write();

        if let Some(market) = update.market {
            let market = market.trim().to_uppercase();
            if market.is_empty() {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "market must not be empty" })),
                ));
            }
            if market != config.market {
                info!(from = %config.market, to = %market, "market changed via API");
                config.market = market;
                market_changed = true;
            }
        }

        if let Some(auto) = update.auto_refresh {
            if auto != config.auto_refresh {
                info!(auto_refresh = auto, "auto-refresh toggled via API");
                config.auto_refresh = auto;
            }
        }
    }

    if market_changed {
        state.market.begin_refresh();
    }

    // Best-effort persistence; the API response reflects the live config
    // either way.
    let config = state.runtime_config.read().clone();
    if let Err(e) = config.save(crate::CONFIG_PATH) {
        tracing::warn!(error = %e, "failed to save config to disk");
    }

    Ok(Json(config))
}
