// =============================================================================
// Refresh Cycle — fetch, aggregate, commit
// =============================================================================
//
// One cycle issues the summary, order-book and history fetches concurrently;
// they may complete in either order or partially fail. Each pipeline commits
// into the market store only on its own success, so a failed fetch leaves
// that half of the view stale-but-consistent and never touches the other
// half.
// =============================================================================

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::market::history::filter_window;

/// Per-pipeline outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RefreshReport {
    pub summary_ok: bool,
    pub book_ok: bool,
    pub history_ok: bool,
}

/// Run one full fetch-aggregate-commit pass across all three pipelines.
pub async fn refresh_once(state: &AppState) -> RefreshReport {
    let (market, book_depth, history_count, window_days, bin_size_secs) = {
        let config = state.runtime_config.read();
        (
            config.market.clone(),
            config.book_depth,
            config.history_count,
            config.history_window_days,
            config.bin_size_secs,
        )
    };

    let client = state.client.clone();

    let (summary_res, book_res, history_res) = tokio::join!(
        client.get_market_summary(&market),
        client.get_order_book(&market, book_depth),
        client.get_market_history(&market, history_count),
    );

    let summary_ok = match summary_res {
        Ok(summary) => {
            let direction = state.market.update_last_price(summary.last_price);
            info!(
                market = %market,
                last = summary.last_price,
                prev_day = summary.prev_day,
                direction = %direction,
                "summary committed"
            );
            true
        }
        Err(e) => {
            warn!(market = %market, error = %e, "summary fetch failed — prior last price retained");
            state.push_error(format!("market summary: {e}"));
            false
        }
    };

    let book_ok = match book_res {
        Ok((bids, asks)) => {
            state.market.commit_order_book(&bids, &asks);
            info!(market = %market, bids = bids.len(), asks = asks.len(), "order book committed");
            true
        }
        Err(e) => {
            warn!(market = %market, error = %e, "order book fetch failed — prior book retained");
            state.push_error(format!("order book: {e}"));
            false
        }
    };

    let history_ok = match history_res {
        Ok(trades) => {
            let window = filter_window(&trades, Utc::now(), Duration::days(window_days));
            let admitted = window.len();
            state.market.commit_trade_history(window, bin_size_secs);
            info!(
                market = %market,
                fetched = trades.len(),
                admitted,
                "trade history committed"
            );
            true
        }
        Err(e) => {
            warn!(market = %market, error = %e, "history fetch failed — prior history retained");
            state.push_error(format!("market history: {e}"));
            false
        }
    };

    RefreshReport {
        summary_ok,
        book_ok,
        history_ok,
    }
}

/// Periodic scheduler: one refresh cycle per interval tick while
/// auto-refresh is enabled.
///
/// The cycle is awaited before the next tick and missed ticks are delayed
/// rather than bursted, so cycles never overlap from this loop. The interval
/// length is read once at startup; changing it requires a restart.
pub async fn run_refresh_loop(state: Arc<AppState>) {
    let period = state.runtime_config.read().refresh_interval_secs.max(1);
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(period));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately; main has already run the
    // startup refresh by the time this loop is spawned.
    interval.tick().await;

    info!(period_secs = period, "refresh loop started");
    loop {
        interval.tick().await;

        if !state.runtime_config.read().auto_refresh {
            continue;
        }

        refresh_once(&state).await;
    }
}
