// =============================================================================
// Runtime Configuration — hot-reloadable settings with atomic save
// =============================================================================
//
// Every tunable for the market view lives here so the service can be
// reconfigured at runtime without a restart. Persistence uses a tmp + rename
// pattern to prevent corruption on crash. All fields carry `#[serde(default)]`
// so that adding new fields never breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_market() -> String {
    "BTC-XQN".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_history_window_days() -> i64 {
    7
}

fn default_bin_size_secs() -> i64 {
    3600
}

fn default_book_depth() -> u32 {
    50
}

fn default_history_count() -> u32 {
    50
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the QuantView backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// The single trading pair being watched, in the exchange's
    /// "QUOTE-BASE" notation.
    #[serde(default = "default_market")]
    pub market: String,

    /// Seconds between automatic refresh cycles.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Whether the periodic timer actually fires refresh cycles. Manual
    /// refreshes via the API work regardless.
    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    /// Trade-history window length in days.
    #[serde(default = "default_history_window_days")]
    pub history_window_days: i64,

    /// Candlestick bin size in seconds.
    #[serde(default = "default_bin_size_secs")]
    pub bin_size_secs: i64,

    /// Number of order-book levels requested per side.
    #[serde(default = "default_book_depth")]
    pub book_depth: u32,

    /// Number of recent trades requested per history fetch.
    #[serde(default = "default_history_count")]
    pub history_count: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            market: default_market(),
            refresh_interval_secs: default_refresh_interval_secs(),
            auto_refresh: true,
            history_window_days: default_history_window_days(),
            bin_size_secs: default_bin_size_secs(),
            book_depth: default_book_depth(),
            history_count: default_history_count(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            market = %config.market,
            refresh_interval_secs = config.refresh_interval_secs,
            "config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }
}
