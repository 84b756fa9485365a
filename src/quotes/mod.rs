//! Quote normalization: raw records to canonical events and best prices.

pub mod normalizer;
pub mod types;

pub use normalizer::{best_price_table, parse_event, parse_price};
pub use types::{BestPriceTable, Event, OutcomeQuote, PricedQuote, Side, SideBest};
