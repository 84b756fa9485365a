//! Canonical event and quote types.

use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use time::OffsetDateTime;

/// One side of a two-way moneyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// Home team wins.
    Home,
    /// Away team wins.
    Away,
}

/// A single bookmaker's price for one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeQuote {
    /// Bookmaker key (e.g. "draftkings").
    pub bookmaker_id: String,
    /// Bookmaker display title.
    pub bookmaker: String,
    /// Outcome name as quoted (a team name).
    pub outcome_name: String,
    /// American odds.
    pub price: Decimal,
    /// Where to place the bet, if the provider sent a link.
    pub source_url: Option<String>,
}

/// An event rebuilt from raw source data on each cycle.
#[derive(Debug, Clone)]
pub struct Event {
    /// Provider event ID.
    pub event_id: String,
    /// Sport key (e.g. "basketball_nba").
    pub sport_key: String,
    /// Sport title (e.g. "NBA").
    pub sport: String,
    /// Home outcome name.
    pub home_team: String,
    /// Away outcome name.
    pub away_team: String,
    /// Start time (UTC).
    pub start_time: OffsetDateTime,
    /// Head-to-head quotes for the home and away outcomes, in source order.
    pub quotes: Vec<OutcomeQuote>,
    /// Some bookmaker's h2h market has a third outcome (e.g. a draw).
    pub three_way: bool,
}

impl Event {
    /// Outcome name for a side.
    pub fn outcome_name(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// "Home vs Away" label.
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// A quote together with its implied probability.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedQuote {
    /// The quote.
    pub quote: OutcomeQuote,
    /// Implied probability of the quote's price.
    pub implied_probability: Decimal,
}

/// Best prices for one side.
#[derive(Debug, Clone, PartialEq)]
pub struct SideBest {
    /// Most favorable quote for this side.
    pub best: PricedQuote,
    /// Most favorable quote from any other bookmaker than `best`'s.
    pub runner_up: Option<PricedQuote>,
}

impl SideBest {
    /// Best quote on this side not offered by `bookmaker_id`.
    pub fn best_excluding(&self, bookmaker_id: &str) -> Option<&PricedQuote> {
        if self.best.quote.bookmaker_id != bookmaker_id {
            Some(&self.best)
        } else {
            self.runner_up.as_ref()
        }
    }
}

/// Best available price per outcome for one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestPriceTable {
    /// Home side, if any valid quote exists.
    pub home: Option<SideBest>,
    /// Away side, if any valid quote exists.
    pub away: Option<SideBest>,
}

impl BestPriceTable {
    /// Entry for a side.
    pub fn get(&self, side: Side) -> Option<&SideBest> {
        match side {
            Side::Home => self.home.as_ref(),
            Side::Away => self.away.as_ref(),
        }
    }

    /// Number of sides with a price (0, 1 or 2).
    pub fn len(&self) -> usize {
        usize::from(self.home.is_some()) + usize::from(self.away.is_some())
    }

    /// True when no side has a price.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both sides have a price.
    pub fn is_complete(&self) -> bool {
        self.len() == 2
    }
}
