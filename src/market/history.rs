// =============================================================================
// Trade History — time-window filter, signed volume, OHLC binning
// =============================================================================
//
// The history endpoint returns an irregular, timestamped trade stream in no
// guaranteed order. The filter admits only trades inside the configured
// window (7 days by default) and flips the quantity sign for sells; the
// binner then buckets the admitted trades into fixed-size OHLC bars for the
// candlestick chart. Volume bars stay at trade resolution — the renderer
// splits them into positive/negative series by sign.
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Side;

/// One raw trade as decoded by the exchange client. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
    pub side: Side,
}

/// A trade admitted by the window filter, with the sell-side sign flip
/// already applied to its volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowedTrade {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub signed_volume: f64,
}

/// One candlestick bar over `[bin_start, bin_start + bin_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub bin_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One volume-chart entry, one per trade (not time-binned).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    pub timestamp: DateTime<Utc>,
    pub signed_volume: f64,
}

/// Retain only trades with `timestamp >= now - window` and flip the quantity
/// sign for sell-side trades.
///
/// Zero- and negative-quantity records are dropped: a zero-quantity trade has
/// no sign and contributes nothing to either chart. Output order follows
/// input order; the binner buckets independently of it.
pub fn filter_window(
    trades: &[TradeRecord],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<WindowedTrade> {
    let cutoff = now - window;
    trades
        .iter()
        .filter(|t| t.timestamp >= cutoff && t.quantity > 0.0)
        .map(|t| WindowedTrade {
            timestamp: t.timestamp,
            price: t.price,
            signed_volume: match t.side {
                Side::Sell => -t.quantity,
                Side::Buy => t.quantity,
            },
        })
        .collect()
}

/// Per-bin accumulator used while scanning the trade batch.
struct OhlcAccum {
    open_ts: DateTime<Utc>,
    open: f64,
    close_ts: DateTime<Utc>,
    close: f64,
    high: f64,
    low: f64,
}

/// Bucket trades into fixed-size OHLC bars.
///
/// The binning origin is the minimum timestamp across the batch; a trade
/// lands in the bin whose anchor `origin + idx * bin_size` is nearest to its
/// timestamp, i.e. `idx = floor((timestamp - origin) / bin_size + 1/2)`.
/// Bins with zero trades are omitted — no synthetic flat candle is inserted
/// for a quiet interval.
///
/// Tie-break for duplicate timestamps inside a bin: open is first-seen-wins,
/// close is last-seen-wins over input order. The feed carries no sequence
/// numbers, so input order is the only ordering available.
pub fn bin_ohlc(trades: &[WindowedTrade], bin_size_secs: i64) -> Vec<OhlcBar> {
    if trades.is_empty() || bin_size_secs <= 0 {
        return Vec::new();
    }

    let origin = trades
        .iter()
        .map(|t| t.timestamp)
        .min()
        .unwrap_or_default();

    let mut bins: BTreeMap<i64, OhlcAccum> = BTreeMap::new();
    for trade in trades {
        let offset = trade.timestamp.timestamp() - origin.timestamp();
        // Integer form of floor(offset / bin_size + 1/2); offset >= 0 since
        // the origin is the batch minimum.
        let idx = (2 * offset + bin_size_secs).div_euclid(2 * bin_size_secs);

        match bins.get_mut(&idx) {
            Some(acc) => {
                if trade.timestamp < acc.open_ts {
                    acc.open_ts = trade.timestamp;
                    acc.open = trade.price;
                }
                if trade.timestamp >= acc.close_ts {
                    acc.close_ts = trade.timestamp;
                    acc.close = trade.price;
                }
                acc.high = acc.high.max(trade.price);
                acc.low = acc.low.min(trade.price);
            }
            None => {
                bins.insert(
                    idx,
                    OhlcAccum {
                        open_ts: trade.timestamp,
                        open: trade.price,
                        close_ts: trade.timestamp,
                        close: trade.price,
                        high: trade.price,
                        low: trade.price,
                    },
                );
            }
        }
    }

    bins.into_iter()
        .map(|(idx, acc)| OhlcBar {
            bin_start: origin + Duration::seconds(idx * bin_size_secs),
            open: acc.open,
            high: acc.high,
            low: acc.low,
            close: acc.close,
        })
        .collect()
}

/// Emit one volume bar per admitted trade, preserving input order.
pub fn volume_bars(trades: &[WindowedTrade]) -> Vec<VolumeBar> {
    trades
        .iter()
        .map(|t| VolumeBar {
            timestamp: t.timestamp,
            signed_volume: t.signed_volume,
        })
        .collect()
}
