// =============================================================================
// Depth Curve Builder — cumulative liquidity at-or-better-than each price
// =============================================================================
//
// Both curves are returned in ascending-price order because the depth chart
// plots them on one shared price axis. The bid curve accumulates from the
// best bid DOWN, so after the final re-sort its cumulative column is not
// monotonic in the ascending listing. That is the correct shape — consumers
// must not re-accumulate it.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::order_book::PriceLevel;

/// One point of a cumulative depth curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthPoint {
    pub price: f64,
    pub cumulative_quantity: f64,
}

/// Build the ask-side depth curve from merged, ascending price levels.
///
/// Traverses price ascending; each point carries the total ask liquidity
/// available at or below its price. Assumes unique prices (guaranteed by
/// `merge_quotes`). An empty side yields an empty curve.
pub fn ask_depth_curve(levels: &[PriceLevel]) -> Vec<DepthPoint> {
    let mut curve = Vec::with_capacity(levels.len());
    let mut running = 0.0;
    for level in levels {
        running += level.quantity;
        curve.push(DepthPoint {
            price: level.price,
            cumulative_quantity: running,
        });
    }
    curve
}

/// Build the bid-side depth curve from merged, ascending price levels.
///
/// Traverses price descending (best bid first) so each point carries the
/// total bid liquidity available at or above its price, then re-sorts the
/// points ascending by price for the chart's x-axis.
pub fn bid_depth_curve(levels: &[PriceLevel]) -> Vec<DepthPoint> {
    let mut curve = Vec::with_capacity(levels.len());
    let mut running = 0.0;
    for level in levels.iter().rev() {
        running += level.quantity;
        curve.push(DepthPoint {
            price: level.price,
            cumulative_quantity: running,
        });
    }
    curve.sort_by(|a, b| a.price.total_cmp(&b.price));
    curve
}
