//! Opportunity filtering and ordering.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::debug;

use super::calculator::Opportunity;

/// Snapshot sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SortKey {
    /// Earliest start time first.
    #[strum(to_string = "time", serialize = "by_time", serialize = "start_time")]
    Time,
    /// Largest margin first.
    #[strum(to_string = "margin", serialize = "by_margin", serialize = "arb_percent")]
    #[default]
    Margin,
    /// Largest profit first.
    #[strum(to_string = "profit", serialize = "by_profit")]
    Profit,
}

impl SortKey {
    /// Parse a selector, falling back to [`SortKey::Margin`].
    pub fn parse_or_default(value: &str) -> Self {
        SortKey::from_str(value.trim()).unwrap_or_else(|_| {
            debug!(value, "Unknown sort key, using default");
            SortKey::default()
        })
    }
}

/// Drop opportunities below `min_profit_percent`, then sort by `key`.
///
/// The sort is stable: equal keys keep discovery order.
pub fn rank(
    opportunities: Vec<Opportunity>,
    key: SortKey,
    min_profit_percent: Decimal,
) -> Vec<Opportunity> {
    let mut ranked: Vec<Opportunity> = opportunities
        .into_iter()
        .filter(|o| o.profit_percent >= min_profit_percent)
        .collect();

    match key {
        SortKey::Time => ranked.sort_by(|a, b| a.start_time.cmp(&b.start_time)),
        SortKey::Margin => ranked.sort_by(|a, b| b.margin_percent.cmp(&a.margin_percent)),
        SortKey::Profit => ranked.sort_by(|a, b| b.profit_percent.cmp(&a.profit_percent)),
    }

    ranked
}
