// =============================================================================
// Central Application State — QuantView market backend
// =============================================================================
//
// Ties the runtime config, the shared market store, the exchange client and
// the error log together. All async tasks hold `Arc<AppState>`.
//
// Thread safety:
//   - parking_lot::RwLock for mutable shared collections.
//   - The market store manages its own interior mutability and version
//     counter.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::bittrex::BittrexClient;
use crate::market::MarketState;
use crate::runtime_config::RuntimeConfig;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the dashboard status line.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across all async tasks.
pub struct AppState {
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub market: Arc<MarketState>,
    pub client: Arc<BittrexClient>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,
    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.
    /// The returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            runtime_config: Arc::new(RwLock::new(config)),
            market: Arc::new(MarketState::new()),
            client: Arc::new(BittrexClient::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, message: String) {
        let record = ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_ring_buffer_is_capped() {
        let state = AppState::new(RuntimeConfig::default());
        for i in 0..(MAX_RECENT_ERRORS + 10) {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        // Oldest entries were evicted first.
        assert_eq!(errors[0].message, "error 10");
    }
}
