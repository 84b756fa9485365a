//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::arbitrage::SortKey;
use crate::error::{ArbError, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds Provider ===
    /// API key for the odds provider.
    pub odds_api_key: String,

    /// Odds provider base URL.
    #[serde(default = "default_api_url")]
    pub odds_api_url: String,

    /// Sport keys to scan each cycle (comma-separated in the environment).
    #[serde(default = "default_sports")]
    pub sports: Vec<String>,

    /// Bookmaker regions to request (e.g. "us", "us,uk").
    #[serde(default = "default_regions")]
    pub regions: String,

    /// Ask the provider for bookmaker deep links.
    #[serde(default = "default_true")]
    pub include_links: bool,

    // === Refresh Cycle ===
    /// Seconds between refresh cycles.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Per-sport fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    // === Ranking ===
    /// Sort order: time, margin (arb_percent) or profit.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// Drop opportunities whose profit percent is below this value.
    #[serde(default)]
    pub min_profit_percent: Decimal,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "https://api.the-odds-api.com".to_string()
}

fn default_sports() -> Vec<String> {
    vec!["upcoming".to_string()]
}

fn default_regions() -> String {
    "us".to_string()
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_sort_by() -> String {
    "margin".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Build a configuration with defaults for everything but the API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            odds_api_key: api_key.into(),
            odds_api_url: default_api_url(),
            sports: default_sports(),
            regions: default_regions(),
            include_links: true,
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            sort_by: default_sort_by(),
            min_profit_percent: Decimal::ZERO,
            port: default_port(),
            metrics_enabled: true,
            rust_log: default_log_level(),
            verbose: false,
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<()> {
        if self.odds_api_key.trim().is_empty() {
            return Err(ArbError::InvalidConfig("ODDS_API_KEY is required".to_string()));
        }

        if url::Url::parse(&self.odds_api_url).is_err() {
            return Err(ArbError::InvalidConfig(
                format!("ODDS_API_URL is not a valid URL: {}", self.odds_api_url),
            ));
        }

        if self.sports.iter().all(|s| s.trim().is_empty()) {
            return Err(ArbError::InvalidConfig("SPORTS must name at least one sport".to_string()));
        }

        if self.refresh_interval_secs == 0 {
            return Err(ArbError::InvalidConfig(
                "REFRESH_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(ArbError::InvalidConfig(
                "FETCH_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout_secs >= self.refresh_interval_secs {
            return Err(ArbError::InvalidConfig(
                "FETCH_TIMEOUT_SECS must be shorter than REFRESH_INTERVAL_SECS".to_string(),
            ));
        }

        if self.min_profit_percent < Decimal::ZERO {
            return Err(ArbError::InvalidConfig(
                "MIN_PROFIT_PERCENT must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured sport keys, trimmed, blanks removed.
    pub fn sport_keys(&self) -> Vec<String> {
        self.sports
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Sort key; unrecognized values fall back to the default.
    pub fn sort_key(&self) -> SortKey {
        SortKey::parse_or_default(&self.sort_by)
    }

    /// Interval between refresh cycles.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Per-sport fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
