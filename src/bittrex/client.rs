// =============================================================================
// Bittrex REST API Client — public market-data endpoints
// =============================================================================
//
// Only the unauthenticated v1.1 endpoints are used (summary, order book,
// market history), so there is no request signing. Wire JSON is decoded into
// typed records exactly once, here; nothing downstream ever inspects loose
// JSON values. Malformed history entries (missing id, unparseable timestamp)
// are dropped per record, reported only in aggregate.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market::{Quote, TradeRecord};
use crate::types::Side;

/// Timestamps arrive as naive ISO-8601 with optional fractional seconds,
/// implicitly UTC (e.g. "2014-11-14T02:38:08.307").
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Bittrex public REST API client.
#[derive(Debug, Clone)]
pub struct BittrexClient {
    base_url: String,
    client: reqwest::Client,
}

/// Per-cycle scalar summary for the configured market.
#[derive(Debug, Clone, Copy)]
pub struct MarketSummary {
    pub last_price: f64,
    pub prev_day: f64,
}

// =============================================================================
// Wire types
// =============================================================================

/// Every v1.1 response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    message: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSummary {
    #[serde(default)]
    last: f64,
    #[serde(default)]
    prev_day: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBookEntry {
    #[serde(default)]
    quantity: f64,
    #[serde(default)]
    rate: f64,
}

#[derive(Debug, Deserialize)]
struct RawOrderBook {
    #[serde(default)]
    buy: Vec<RawBookEntry>,
    #[serde(default)]
    sell: Vec<RawBookEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTradeEntry {
    id: Option<i64>,
    time_stamp: Option<String>,
    #[serde(default)]
    quantity: f64,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    order_type: String,
}

// =============================================================================
// Client
// =============================================================================

impl BittrexClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: "https://bittrex.com/api/v1.1".to_string(),
            client,
        }
    }

    /// GET /public/getmarketsummary — last trade price for `market`.
    #[instrument(skip(self), name = "bittrex::get_market_summary")]
    pub async fn get_market_summary(&self, market: &str) -> Result<MarketSummary> {
        let url = format!(
            "{}/public/getmarketsummary?market={}",
            self.base_url, market
        );
        // The summary endpoint wraps a single-element array.
        let summaries: Vec<RawSummary> = self.get_result(&url, "getmarketsummary").await?;
        let raw = summaries
            .into_iter()
            .next()
            .context("getmarketsummary returned an empty result")?;

        debug!(market, last = raw.last, "market summary fetched");
        Ok(MarketSummary {
            last_price: raw.last,
            prev_day: raw.prev_day,
        })
    }

    /// GET /public/getorderbook?type=both — raw (bids, asks) quote lists.
    ///
    /// The lists are returned as-is: unsorted and possibly carrying duplicate
    /// prices. Merging is the aggregation core's job.
    #[instrument(skip(self), name = "bittrex::get_order_book")]
    pub async fn get_order_book(
        &self,
        market: &str,
        depth: u32,
    ) -> Result<(Vec<Quote>, Vec<Quote>)> {
        let url = format!(
            "{}/public/getorderbook?market={}&type=both&depth={}",
            self.base_url, market, depth
        );
        let book: RawOrderBook = self.get_result(&url, "getorderbook").await?;

        let bids = convert_book_side(book.buy);
        let asks = convert_book_side(book.sell);

        debug!(
            market,
            bids = bids.len(),
            asks = asks.len(),
            "order book fetched"
        );
        Ok((bids, asks))
    }

    /// GET /public/getmarkethistory — recent trades as typed records.
    ///
    /// Entries with a missing id or an unparseable timestamp are dropped
    /// here, before the aggregation core ever sees them.
    #[instrument(skip(self), name = "bittrex::get_market_history")]
    pub async fn get_market_history(
        &self,
        market: &str,
        count: u32,
    ) -> Result<Vec<TradeRecord>> {
        let url = format!(
            "{}/public/getmarkethistory?market={}&count={}",
            self.base_url, market, count
        );
        let raw: Vec<RawTradeEntry> = self.get_result(&url, "getmarkethistory").await?;

        let total = raw.len();
        let trades = convert_history_entries(raw);
        let dropped = total - trades.len();
        if dropped > 0 {
            warn!(market, dropped, "malformed market-history entries skipped");
        }

        debug!(market, count = trades.len(), "market history fetched");
        Ok(trades)
    }

    /// Issue a GET, unwrap the `{ success, message, result }` envelope, and
    /// surface HTTP or API-level failures as one transport error.
    async fn get_result<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {what} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Bittrex {what} returned HTTP {status}");
        }

        let envelope: ApiEnvelope<T> = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {what} response"))?;

        if !envelope.success {
            anyhow::bail!("Bittrex {what} reported failure: {}", envelope.message);
        }

        envelope
            .result
            .with_context(|| format!("Bittrex {what} response missing result"))
    }
}

impl Default for BittrexClient {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Wire-to-domain conversion
// =============================================================================

fn convert_book_side(entries: Vec<RawBookEntry>) -> Vec<Quote> {
    entries
        .into_iter()
        .map(|e| Quote {
            price: e.rate,
            quantity: e.quantity,
        })
        .collect()
}

fn convert_history_entries(entries: Vec<RawTradeEntry>) -> Vec<TradeRecord> {
    entries
        .into_iter()
        .filter_map(|e| {
            e.id?;
            let timestamp = parse_timestamp(e.time_stamp.as_deref()?)?;
            Some(TradeRecord {
                timestamp,
                price: e.price,
                quantity: e.quantity,
                side: Side::from_order_type(&e.order_type),
            })
        })
        .collect()
}

/// Parse the feed's naive timestamp as UTC. Returns `None` on malformed
/// input; the caller drops the record.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parse_timestamp_with_and_without_fraction() {
        let with = parse_timestamp("2014-11-14T02:38:08.307").expect("should parse");
        assert_eq!(with.hour(), 2);
        assert_eq!(with.timestamp_subsec_millis(), 307);

        let without = parse_timestamp("2014-11-14T02:38:08").expect("should parse");
        assert_eq!(without.timestamp_subsec_millis(), 0);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("14/11/2014 02:38").is_none());
    }

    #[test]
    fn order_book_envelope_decodes() {
        let json = r#"{
            "success": true,
            "message": "",
            "result": {
                "buy": [
                    { "Quantity": 12.37, "Rate": 0.02525 },
                    { "Quantity": 5.0, "Rate": 0.02525 }
                ],
                "sell": [
                    { "Quantity": 32.55, "Rate": 0.02540 }
                ]
            }
        }"#;
        let envelope: ApiEnvelope<RawOrderBook> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        let book = envelope.result.unwrap();
        assert_eq!(book.buy.len(), 2);
        assert_eq!(book.sell.len(), 1);

        let bids = convert_book_side(book.buy);
        assert_eq!(bids[0].price, 0.02525);
        assert_eq!(bids[0].quantity, 12.37);
    }

    #[test]
    fn history_envelope_decodes_and_drops_malformed() {
        let json = r#"{
            "success": true,
            "message": "",
            "result": [
                { "Id": 664, "TimeStamp": "2014-11-14T02:38:08.307", "Quantity": 171.48, "Price": 0.00002269, "Total": 0.00389, "FillType": "PARTIAL_FILL", "OrderType": "SELL" },
                { "Id": 665, "TimeStamp": "2014-11-14T03:00:00", "Quantity": 10.0, "Price": 0.00002300, "Total": 0.00023, "FillType": "FILL", "OrderType": "BUY" },
                { "TimeStamp": "2014-11-14T03:01:00", "Quantity": 1.0, "Price": 0.00002300, "OrderType": "BUY" },
                { "Id": 666, "TimeStamp": "not a date", "Quantity": 1.0, "Price": 0.00002300, "OrderType": "BUY" }
            ]
        }"#;
        let envelope: ApiEnvelope<Vec<RawTradeEntry>> = serde_json::from_str(json).unwrap();
        let trades = convert_history_entries(envelope.result.unwrap());

        // Missing id and unparseable timestamp are both dropped.
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, Side::Sell);
        assert_eq!(trades[1].side, Side::Buy);
        assert!((trades[0].quantity - 171.48).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_envelope_decodes() {
        let json = r#"{
            "success": true,
            "message": "",
            "result": [
                { "MarketName": "BTC-XQN", "High": 0.0231, "Low": 0.0199, "Last": 0.0213, "PrevDay": 0.0201, "Volume": 22340.5 }
            ]
        }"#;
        let envelope: ApiEnvelope<Vec<RawSummary>> = serde_json::from_str(json).unwrap();
        let raw = envelope.result.unwrap();
        assert_eq!(raw.len(), 1);
        assert!((raw[0].last - 0.0213).abs() < f64::EPSILON);
        assert!((raw[0].prev_day - 0.0201).abs() < f64::EPSILON);
    }

    #[test]
    fn api_failure_envelope_decodes() {
        let json = r#"{ "success": false, "message": "INVALID_MARKET", "result": null }"#;
        let envelope: ApiEnvelope<RawOrderBook> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message, "INVALID_MARKET");
        assert!(envelope.result.is_none());
    }
}
