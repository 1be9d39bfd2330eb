pub mod depth;
pub mod history;
pub mod order_book;
pub mod state;

// Re-export the aggregate types for convenient access (e.g. `use crate::market::MarketState`).
pub use depth::DepthPoint;
pub use history::{OhlcBar, TradeRecord, VolumeBar, WindowedTrade};
pub use order_book::{PriceLevel, Quote};
pub use state::{MarketSnapshot, MarketState};
