//! Odds provider client (the-odds-api.com v4).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::SourceError;
use crate::metrics;

/// Anything that can produce raw event records for a sport.
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// Fetch every raw event record for `sport`.
    ///
    /// The caller bounds the call with its own timeout.
    async fn fetch(&self, sport: &str) -> Result<Vec<Value>, SourceError>;
}

/// HTTP client for the odds provider.
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Provider base URL.
    base_url: String,
    /// Provider API key.
    api_key: String,
    /// Bookmaker regions.
    regions: String,
    /// Request deep links.
    include_links: bool,
}

impl OddsApiClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            // The scheduler applies the per-sport timeout; this is a backstop.
            .timeout(config.fetch_timeout() + Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            base_url: config.odds_api_url.trim_end_matches('/').to_string(),
            api_key: config.odds_api_key.clone(),
            regions: config.regions.clone(),
            include_links: config.include_links,
        }
    }

    /// URL of the odds endpoint for a sport.
    pub fn odds_url(&self, sport: &str) -> String {
        format!("{}/v4/sports/{}/odds", self.base_url, sport)
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![
            ("apiKey", self.api_key.as_str()),
            ("regions", self.regions.as_str()),
            ("markets", "h2h"),
            ("oddsFormat", "american"),
            ("dateFormat", "iso"),
        ];
        if self.include_links {
            query.push(("includeLinks", "true"));
        }
        query
    }
}

#[async_trait]
impl OddsSource for OddsApiClient {
    #[instrument(skip(self), fields(sport = %sport))]
    async fn fetch(&self, sport: &str) -> Result<Vec<Value>, SourceError> {
        let start = Instant::now();

        let response = self
            .http
            .get(self.odds_url(sport))
            .query(&self.query())
            .send()
            .await
            .map_err(|source| SourceError::Request {
                sport: sport.to_string(),
                source,
            })?;

        if let Some(remaining) = response.headers().get("x-requests-remaining") {
            debug!(remaining = ?remaining, "Provider quota");
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                sport: sport.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let records: Vec<Value> = response.json().await.map_err(|e| SourceError::Decode {
            sport: sport.to_string(),
            reason: e.to_string(),
        })?;

        metrics::record_fetch_latency(start, sport);
        debug!(events = records.len(), "Fetched odds");

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_works() {
        let mut config = Config::with_api_key("secret");
        config.odds_api_url = "https://api.the-odds-api.com/".to_string();
        let client = OddsApiClient::new(&config);

        assert_eq!(
            client.odds_url("basketball_nba"),
            "https://api.the-odds-api.com/v4/sports/basketball_nba/odds"
        );
    }

    #[test]
    fn query_requests_american_h2h() {
        let config = Config::with_api_key("secret");
        let client = OddsApiClient::new(&config);
        let query = client.query();

        assert!(query.contains(&("markets", "h2h")));
        assert!(query.contains(&("oddsFormat", "american")));
        assert!(query.contains(&("apiKey", "secret")));
        assert!(query.contains(&("includeLinks", "true")));
    }

    #[test]
    fn links_can_be_disabled() {
        let mut config = Config::with_api_key("secret");
        config.include_links = false;
        let client = OddsApiClient::new(&config);

        assert!(!client.query().iter().any(|(k, _)| *k == "includeLinks"));
    }
}
