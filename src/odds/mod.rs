//! Odds source adapter.
//!
//! This module handles:
//! - Provider wire types
//! - The `OddsSource` trait and its HTTP implementation
//! - Mock source for testing

pub mod client;
pub mod mock;
pub mod types;

pub use client::{OddsApiClient, OddsSource};
pub use mock::{MockEventBuilder, MockOddsSource, MockResponse};
pub use types::{MarketKey, RawEvent};
