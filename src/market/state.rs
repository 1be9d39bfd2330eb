// =============================================================================
// Market State Store — the single shared aggregate behind one lock
// =============================================================================
//
// Both pipelines (order book, trade history) write disjoint halves of this
// store; the renderer reads it. Every commit replaces its half wholesale
// inside one critical section, so a reader never observes a book with only
// bids updated, or a candle series mid-rebuild. A failed fetch simply means
// no commit for that half this cycle — the previous aggregate stays visible
// (stale but consistent) instead of blanking to empty.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::types::PriceDirection;

use super::depth::{ask_depth_curve, bid_depth_curve, DepthPoint};
use super::history::{bin_ohlc, volume_bars, OhlcBar, VolumeBar, WindowedTrade};
use super::order_book::{merge_quotes, PriceLevel, Quote};

/// All fields guarded by the one store lock.
#[derive(Debug, Default)]
struct Inner {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    bid_depth: Vec<DepthPoint>,
    ask_depth: Vec<DepthPoint>,
    trades: Vec<WindowedTrade>,
    ohlc: Vec<OhlcBar>,
    volume: Vec<VolumeBar>,
    last_price: f64,
    price_direction: PriceDirection,
    book_updated_at: Option<DateTime<Utc>>,
    history_updated_at: Option<DateTime<Utc>>,
}

/// Shared market state for the configured trading pair.
///
/// Owned by the refresh pipelines during rebuild; the API layer takes
/// read-only snapshots under the same lock.
pub struct MarketState {
    inner: RwLock<Inner>,
    /// Incremented on every commit; the WebSocket feed uses this to detect
    /// changes and push fresh snapshots.
    version: AtomicU64,
}

impl MarketState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            version: AtomicU64::new(1),
        }
    }

    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst)
    }

    /// Atomically clear every aggregate, including the last-price indicator.
    ///
    /// Called when the configured market pair changes — serving the old
    /// pair's book or history under the new pair's name would be wrong.
    /// Regular refresh cycles do NOT clear: each commit is a wholesale
    /// replacement, and keeping prior data through a failed fetch is the
    /// point.
    pub fn begin_refresh(&self) {
        {
            let mut inner = self.inner.write();
            *inner = Inner::default();
        }
        self.bump_version();
        info!("market state cleared");
    }

    /// Merge both raw quote lists, derive the depth curves, and install the
    /// whole order-book half in one critical section.
    pub fn commit_order_book(&self, raw_bids: &[Quote], raw_asks: &[Quote]) {
        // Pure aggregation happens outside the lock.
        let bids = merge_quotes(raw_bids);
        let asks = merge_quotes(raw_asks);
        let bid_depth = bid_depth_curve(&bids);
        let ask_depth = ask_depth_curve(&asks);

        debug!(
            bid_levels = bids.len(),
            ask_levels = asks.len(),
            "order book committed"
        );

        {
            let mut inner = self.inner.write();
            inner.bids = bids;
            inner.asks = asks;
            inner.bid_depth = bid_depth;
            inner.ask_depth = ask_depth;
            inner.book_updated_at = Some(Utc::now());
        }
        self.bump_version();
    }

    /// Install the filtered trade window plus its derived OHLC bars and
    /// volume bars in one critical section.
    ///
    /// The window is stored sorted by timestamp (duplicates permitted); the
    /// bars are derived from the caller's input order so the documented
    /// open/close tie-breaks survive.
    pub fn commit_trade_history(&self, trades: Vec<WindowedTrade>, bin_size_secs: i64) {
        let ohlc = bin_ohlc(&trades, bin_size_secs);
        let volume = volume_bars(&trades);

        let mut window = trades;
        window.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        debug!(
            trades = window.len(),
            bars = ohlc.len(),
            "trade history committed"
        );

        {
            let mut inner = self.inner.write();
            inner.trades = window;
            inner.ohlc = ohlc;
            inner.volume = volume;
            inner.history_updated_at = Some(Utc::now());
        }
        self.bump_version();
    }

    /// Set the last trade price and derive its direction against the
    /// previous value. A first observation (previous price zero) counts as
    /// unchanged.
    ///
    /// Non-positive prices are malformed feed noise (a summary missing its
    /// last-price field decodes to 0.0) and are ignored: the prior value and
    /// direction stay in place and no commit happens.
    pub fn update_last_price(&self, last: f64) -> PriceDirection {
        let direction;
        {
            let mut inner = self.inner.write();
            if last <= 0.0 {
                return inner.price_direction;
            }
            let prev = inner.last_price;
            direction = if prev == 0.0 || last == prev {
                PriceDirection::Unchanged
            } else if last < prev {
                PriceDirection::Down
            } else {
                PriceDirection::Up
            };
            inner.last_price = last;
            inner.price_direction = direction;
        }
        self.bump_version();
        direction
    }

    /// Copy out an immutable view for the rendering collaborator. The lock
    /// is held only for the copy, never across serialization or rendering.
    pub fn snapshot(&self) -> MarketSnapshot {
        let inner = self.inner.read();
        MarketSnapshot {
            version: self.current_version(),
            bids: inner.bids.clone(),
            asks: inner.asks.clone(),
            bid_depth: inner.bid_depth.clone(),
            ask_depth: inner.ask_depth.clone(),
            trades: inner.trades.clone(),
            ohlc: inner.ohlc.clone(),
            volume: inner.volume.clone(),
            last_price: inner.last_price,
            price_direction: inner.price_direction,
            book_updated_at: inner.book_updated_at,
            history_updated_at: inner.history_updated_at,
        }
    }
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the full market state, handed to the chart consumer.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub version: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub bid_depth: Vec<DepthPoint>,
    pub ask_depth: Vec<DepthPoint>,
    pub trades: Vec<WindowedTrade>,
    pub ohlc: Vec<OhlcBar>,
    pub volume: Vec<VolumeBar>,
    pub last_price: f64,
    pub price_direction: PriceDirection,
    pub book_updated_at: Option<DateTime<Utc>>,
    pub history_updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote(price: f64, quantity: f64) -> Quote {
        Quote { price, quantity }
    }

    fn wt(secs: i64, price: f64, signed_volume: f64) -> WindowedTrade {
        WindowedTrade {
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            price,
            signed_volume,
        }
    }

    #[test]
    fn commit_order_book_installs_merged_levels_and_curves() {
        let state = MarketState::new();
        state.commit_order_book(
            &[quote(9.0, 2.0), quote(8.0, 1.0)],
            &[quote(10.0, 1.0), quote(10.0, 2.0), quote(11.0, 5.0)],
        );

        let snap = state.snapshot();
        assert_eq!(snap.asks.len(), 2);
        assert!((snap.asks[0].quantity - 3.0).abs() < f64::EPSILON);

        // Ask depth: [(10,3),(11,8)].
        assert!((snap.ask_depth[0].cumulative_quantity - 3.0).abs() < f64::EPSILON);
        assert!((snap.ask_depth[1].cumulative_quantity - 8.0).abs() < f64::EPSILON);

        // Bid depth, ascending listing: [(8,3),(9,2)].
        assert_eq!(snap.bid_depth[0].price, 8.0);
        assert!((snap.bid_depth[0].cumulative_quantity - 3.0).abs() < f64::EPSILON);
        assert!((snap.bid_depth[1].cumulative_quantity - 2.0).abs() < f64::EPSILON);

        assert!(snap.book_updated_at.is_some());
        assert!(snap.history_updated_at.is_none());
    }

    #[test]
    fn commit_trade_history_sorts_window_and_derives_bars() {
        let state = MarketState::new();
        state.commit_trade_history(vec![wt(3700, 11.0, 1.0), wt(100, 10.0, -2.0)], 3600);

        let snap = state.snapshot();
        assert_eq!(snap.trades.len(), 2);
        // Window is stored timestamp-sorted even though input was not.
        assert!(snap.trades[0].timestamp <= snap.trades[1].timestamp);
        assert_eq!(snap.ohlc.len(), 2);
        // Volume bars preserve input order, one per trade.
        assert_eq!(snap.volume.len(), 2);
        assert_eq!(snap.volume[0].signed_volume, 1.0);
    }

    #[test]
    fn pipelines_commit_independently() {
        let state = MarketState::new();
        state.commit_order_book(&[quote(9.0, 2.0)], &[quote(10.0, 1.0)]);
        let before = state.snapshot();

        // History pipeline failing this cycle means no history commit; the
        // book half must be untouched.
        state.commit_trade_history(vec![wt(100, 10.0, 1.0)], 3600);
        let after = state.snapshot();
        assert_eq!(after.bids, before.bids);
        assert_eq!(after.ask_depth, before.ask_depth);
        assert_eq!(after.ohlc.len(), 1);
    }

    #[test]
    fn last_price_direction_tracking() {
        let state = MarketState::new();
        // First observation has nothing to compare against.
        assert_eq!(state.update_last_price(5.0), PriceDirection::Unchanged);
        assert_eq!(state.update_last_price(6.0), PriceDirection::Up);
        assert_eq!(state.update_last_price(4.0), PriceDirection::Down);
        assert_eq!(state.update_last_price(4.0), PriceDirection::Unchanged);

        let snap = state.snapshot();
        assert_eq!(snap.last_price, 4.0);
        assert_eq!(snap.price_direction, PriceDirection::Unchanged);
    }

    #[test]
    fn non_positive_last_price_is_ignored() {
        let state = MarketState::new();
        assert_eq!(state.update_last_price(5.0), PriceDirection::Unchanged);
        assert_eq!(state.update_last_price(6.0), PriceDirection::Up);
        let version = state.current_version();

        // A summary missing its last-price field decodes to 0.0; it must
        // not clobber the indicator or register as a Down move.
        assert_eq!(state.update_last_price(0.0), PriceDirection::Up);
        assert_eq!(state.update_last_price(-1.0), PriceDirection::Up);

        let snap = state.snapshot();
        assert_eq!(snap.last_price, 6.0);
        assert_eq!(snap.price_direction, PriceDirection::Up);
        // No commit happened, so the version is untouched.
        assert_eq!(state.current_version(), version);
    }

    #[test]
    fn begin_refresh_clears_everything() {
        let state = MarketState::new();
        state.commit_order_book(&[quote(9.0, 2.0)], &[quote(10.0, 1.0)]);
        state.commit_trade_history(vec![wt(100, 10.0, 1.0)], 3600);
        state.update_last_price(10.0);

        state.begin_refresh();
        let snap = state.snapshot();
        assert!(snap.bids.is_empty());
        assert!(snap.asks.is_empty());
        assert!(snap.bid_depth.is_empty());
        assert!(snap.ohlc.is_empty());
        assert!(snap.volume.is_empty());
        assert_eq!(snap.last_price, 0.0);
    }

    #[test]
    fn version_increments_on_every_commit() {
        let state = MarketState::new();
        let v0 = state.current_version();
        state.commit_order_book(&[], &[]);
        let v1 = state.current_version();
        state.commit_trade_history(Vec::new(), 3600);
        let v2 = state.current_version();
        assert!(v0 < v1 && v1 < v2);
    }
}
