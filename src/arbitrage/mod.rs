//! Arbitrage module for evaluating and ranking opportunities.
//!
//! This module handles:
//! - Implied probability and margin/profit math
//! - Per-event detection from raw records
//! - Filtering and ordering of a cycle's opportunities

pub mod calculator;
pub mod detector;
pub mod ranker;

pub use calculator::{
    arbitrage_metrics, calculate_opportunity, implied_probability, ArbitrageMetrics, Leg,
    Opportunity,
};
pub use detector::{check_event, detect_opportunities, Detection, EventOutcome};
pub use ranker::{rank, SortKey};
