// =============================================================================
// Shared types used across the QuantView market backend
// =============================================================================

use serde::{Deserialize, Serialize};

/// Aggressor side of a trade as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Map the exchange's `OrderType` string onto a side.
    ///
    /// The feed only distinguishes "SELL"; every other value (including
    /// partial-fill markers) counts as a buy.
    pub fn from_order_type(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("SELL") {
            Self::Sell
        } else {
            Self::Buy
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// Direction of the last trade price relative to the previous refresh,
/// driving the dashboard's colored price indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceDirection {
    Up,
    Down,
    Unchanged,
}

impl Default for PriceDirection {
    fn default() -> Self {
        Self::Unchanged
    }
}

impl std::fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "Up"),
            Self::Down => write!(f, "Down"),
            Self::Unchanged => write!(f, "Unchanged"),
        }
    }
}
