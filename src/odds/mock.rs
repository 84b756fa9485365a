//! Mock odds source for unit testing.
//!
//! This module provides a source that can be used in tests without making
//! real network requests, plus a builder for raw event records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::client::OddsSource;
use crate::error::SourceError;

/// Canned behavior for one sport.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these records.
    Records(Vec<Value>),
    /// Fail with an HTTP status.
    Status(u16),
    /// Sleep this long, then return these records.
    Delayed(Duration, Vec<Value>),
}

/// Mock odds source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockOddsSource {
    /// Canned responses by sport key.
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// Sports requested, in call order.
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockOddsSource {
    /// Create an empty mock source. Unknown sports return no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for a sport.
    pub fn set_response(&self, sport: impl Into<String>, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(sport.into(), response);
    }

    /// Set the records returned for a sport.
    pub fn set_records(&self, sport: impl Into<String>, records: Vec<Value>) {
        self.set_response(sport, MockResponse::Records(records));
    }

    /// Make a sport fail with an HTTP status.
    pub fn fail_with_status(&self, sport: impl Into<String>, status: u16) {
        self.set_response(sport, MockResponse::Status(status));
    }

    /// Sports fetched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OddsSource for MockOddsSource {
    async fn fetch(&self, sport: &str) -> Result<Vec<Value>, SourceError> {
        self.calls.lock().unwrap().push(sport.to_string());
        let response = self.responses.lock().unwrap().get(sport).cloned();

        match response {
            None => Ok(Vec::new()),
            Some(MockResponse::Records(records)) => Ok(records),
            Some(MockResponse::Status(status)) => Err(SourceError::Status {
                sport: sport.to_string(),
                status,
                body: "Mock failure".to_string(),
            }),
            Some(MockResponse::Delayed(delay, records)) => {
                tokio::time::sleep(delay).await;
                Ok(records)
            }
        }
    }
}

/// Builder for raw provider event records.
pub struct MockEventBuilder {
    id: String,
    sport_key: String,
    sport_title: String,
    commence_time: String,
    home_team: String,
    away_team: String,
    bookmakers: Vec<(String, Vec<Value>)>,
}

impl MockEventBuilder {
    /// Create a builder for an NBA event.
    pub fn new(id: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sport_key: "basketball_nba".to_string(),
            sport_title: "NBA".to_string(),
            commence_time: "2025-03-01T00:30:00Z".to_string(),
            home_team: home.into(),
            away_team: away.into(),
            bookmakers: Vec::new(),
        }
    }

    /// Set sport key and title.
    pub fn sport(mut self, key: impl Into<String>, title: impl Into<String>) -> Self {
        self.sport_key = key.into();
        self.sport_title = title.into();
        self
    }

    /// Set the start time (RFC 3339).
    pub fn commence_time(mut self, time: impl Into<String>) -> Self {
        self.commence_time = time.into();
        self
    }

    /// Add an h2h market with home and away prices.
    pub fn h2h(self, bookmaker: &str, home_price: i64, away_price: i64) -> Self {
        let home = self.home_team.clone();
        let away = self.away_team.clone();
        self.market(
            bookmaker,
            "h2h",
            &[(home.as_str(), json!(home_price)), (away.as_str(), json!(away_price))],
        )
    }

    /// Add an arbitrary market to a bookmaker.
    pub fn market(mut self, bookmaker: &str, key: &str, outcomes: &[(&str, Value)]) -> Self {
        let outcomes: Vec<Value> = outcomes
            .iter()
            .map(|(name, price)| json!({ "name": name, "price": price }))
            .collect();
        let market = json!({ "key": key, "outcomes": outcomes });

        match self.bookmakers.iter_mut().find(|(k, _)| k == bookmaker) {
            Some((_, markets)) => markets.push(market),
            None => self.bookmakers.push((bookmaker.to_string(), vec![market])),
        }
        self
    }

    /// Build the raw JSON record.
    pub fn build(self) -> Value {
        let bookmakers: Vec<Value> = self
            .bookmakers
            .into_iter()
            .map(|(key, markets)| {
                let mut bookmaker = Map::new();
                bookmaker.insert("title".to_string(), json!(key.to_uppercase()));
                bookmaker.insert(
                    "link".to_string(),
                    json!(format!("https://sportsbook.example/{key}")),
                );
                bookmaker.insert("key".to_string(), json!(key));
                bookmaker.insert("markets".to_string(), Value::Array(markets));
                Value::Object(bookmaker)
            })
            .collect();

        json!({
            "id": self.id,
            "sport_key": self.sport_key,
            "sport_title": self.sport_title,
            "commence_time": self.commence_time,
            "home_team": self.home_team,
            "away_team": self.away_team,
            "bookmakers": bookmakers,
        })
    }
}
