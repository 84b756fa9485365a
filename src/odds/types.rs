//! Wire types for the odds provider's event documents.
//!
//! Every field is optional so that one incomplete record can be rejected on
//! its own instead of failing the whole sport's response.

use serde::Deserialize;
use serde_json::Value;
use strum::{Display, EnumString};

/// Market keys the provider may return for a bookmaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MarketKey {
    /// Head-to-head (moneyline). The only market this scanner prices.
    H2h,
    /// Exchange lay side of head-to-head.
    H2hLay,
    /// Point spreads.
    Spreads,
    /// Over/under totals.
    Totals,
    /// Futures.
    Outrights,
}

/// One event as returned by `/v4/sports/{sport}/odds`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    /// Provider event ID.
    pub id: Option<String>,
    /// Sport key (e.g. "basketball_nba").
    pub sport_key: Option<String>,
    /// Human-readable sport title (e.g. "NBA").
    pub sport_title: Option<String>,
    /// Start time, RFC 3339 in UTC.
    pub commence_time: Option<String>,
    /// Home team name.
    pub home_team: Option<String>,
    /// Away team name.
    pub away_team: Option<String>,
    /// Bookmakers quoting this event.
    #[serde(default)]
    pub bookmakers: Vec<RawBookmaker>,
}

/// A bookmaker's markets for one event.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBookmaker {
    /// Bookmaker key (e.g. "draftkings").
    pub key: Option<String>,
    /// Display title (e.g. "DraftKings").
    pub title: Option<String>,
    /// Event page on the bookmaker's site, when links were requested.
    pub link: Option<String>,
    /// Offered markets.
    #[serde(default)]
    pub markets: Vec<RawMarket>,
}

/// One market offered by a bookmaker.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    /// Market key (h2h, spreads, totals, ...).
    pub key: Option<String>,
    /// Market page, when links were requested.
    pub link: Option<String>,
    /// Outcomes in this market.
    #[serde(default)]
    pub outcomes: Vec<RawOutcome>,
}

impl RawMarket {
    /// Parsed market key; `None` for keys this crate does not know.
    pub fn market_key(&self) -> Option<MarketKey> {
        self.key.as_deref().and_then(|k| k.parse().ok())
    }
}

/// One priced outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOutcome {
    /// Outcome name; for h2h this is a team name or "Draw".
    pub name: Option<String>,
    /// Price, kept as raw JSON so a bad value only drops this quote.
    #[serde(default)]
    pub price: Value,
    /// Bet slip link, when links were requested.
    pub link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn market_key_parses_known_keys() {
        use std::str::FromStr;
        assert_eq!(MarketKey::from_str("h2h").unwrap(), MarketKey::H2h);
        assert_eq!(MarketKey::from_str("h2h_lay").unwrap(), MarketKey::H2hLay);
        assert_eq!(MarketKey::from_str("spreads").unwrap(), MarketKey::Spreads);
        assert!(MarketKey::from_str("player_points").is_err());
    }

    #[test]
    fn raw_event_tolerates_missing_fields() {
        let event: RawEvent = serde_json::from_value(json!({
            "id": "abc",
            "bookmakers": [{ "key": "fanduel", "markets": [{ "key": "h2h" }] }]
        }))
        .unwrap();

        assert_eq!(event.id.as_deref(), Some("abc"));
        assert!(event.home_team.is_none());
        assert_eq!(event.bookmakers.len(), 1);
        assert_eq!(event.bookmakers[0].markets[0].market_key(), Some(MarketKey::H2h));
        assert!(event.bookmakers[0].markets[0].outcomes.is_empty());
    }
}
