pub mod client;

pub use client::{BittrexClient, MarketSummary};
