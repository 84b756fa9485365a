//! Sportsbook moneyline arbitrage scanner.
//!
//! This library polls an odds provider for two-outcome moneyline markets,
//! finds events where the best home and away prices across bookmakers imply
//! probabilities summing to less than 100%, and publishes the ranked set as
//! an immutable snapshot each refresh cycle.
//!
//! # Arbitrage
//!
//! American odds convert to implied probability as `100 / (p + 100)` for
//! positive prices and `|p| / (|p| + 100)` for negative ones. If the best
//! prices on each side sum below 1, splitting the stake across bookmakers
//! returns a profit whichever side wins:
//!
//! ```text
//! Home +150 @ FanDuel:     0.4000
//! Away -130 @ DraftKings:  0.5652
//! ───────────────────────────────
//! Total:                   0.9652 < 1 ✅
//! Margin:                  3.48%
//! Profit:                  3.60% of stake
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Odds provider adapter and mock source
//! - [`quotes`]: Event normalization and best-price tables
//! - [`arbitrage`]: Opportunity evaluation and ranking
//! - [`scheduler`]: Refresh cycle and live snapshot
//! - [`api`]: HTTP API for opportunities, health and metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod metrics;
pub mod odds;
pub mod quotes;
pub mod scheduler;
pub mod utils;

pub use config::Config;
pub use error::{ArbError, Result};
