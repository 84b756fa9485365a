//! Implied probability and arbitrage math for two-way moneylines.

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::quotes::{BestPriceTable, Event, PricedQuote, Side};
use crate::utils::{serialize_decimal, serialize_percent, serialize_probability};

/// Convert American odds to implied probability.
///
/// `+150` → `100 / 250`, `-130` → `130 / 230`. A zero price has no
/// meaning in American odds and yields `None`, as does a price too large
/// to convert or one whose probability does not land strictly inside (0, 1).
pub fn implied_probability(price: Decimal) -> Option<Decimal> {
    let (numerator, denominator) = if price > Decimal::ZERO {
        (Decimal::ONE_HUNDRED, price.checked_add(Decimal::ONE_HUNDRED)?)
    } else if price < Decimal::ZERO {
        let stake = price.abs();
        (stake, stake.checked_add(Decimal::ONE_HUNDRED)?)
    } else {
        return None;
    };

    numerator
        .checked_div(denominator)
        .filter(|p| *p > Decimal::ZERO && *p < Decimal::ONE)
}

/// Edge figures for a pair of implied probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrageMetrics {
    /// Sum of both implied probabilities.
    pub implied_probability_sum: Decimal,
    /// `(1 - sum) * 100`.
    pub margin_percent: Decimal,
    /// `(1 / sum - 1) * 100`: profit per 100 staked across both sides.
    pub profit_percent: Decimal,
}

/// Compute edge figures; `None` unless the sum is strictly below 1.
pub fn arbitrage_metrics(home: Decimal, away: Decimal) -> Option<ArbitrageMetrics> {
    let total = home.checked_add(away)?;
    if total <= Decimal::ZERO || total >= Decimal::ONE {
        return None;
    }

    let margin_percent = (Decimal::ONE - total).checked_mul(Decimal::ONE_HUNDRED)?;
    let profit_percent = Decimal::ONE
        .checked_div(total)?
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)?;

    Some(ArbitrageMetrics {
        implied_probability_sum: total,
        margin_percent,
        profit_percent,
    })
}

/// One leg of an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leg {
    /// Outcome backed by this leg.
    pub outcome: String,
    /// Bookmaker key.
    pub bookmaker_id: String,
    /// Bookmaker display title.
    pub bookmaker: String,
    /// American odds.
    #[serde(serialize_with = "serialize_decimal")]
    pub price: Decimal,
    /// Where to place the bet.
    pub url: Option<String>,
}

impl From<&PricedQuote> for Leg {
    fn from(priced: &PricedQuote) -> Self {
        Self {
            outcome: priced.quote.outcome_name.clone(),
            bookmaker_id: priced.quote.bookmaker_id.clone(),
            bookmaker: priced.quote.bookmaker.clone(),
            price: priced.quote.price,
            url: priced.quote.source_url.clone(),
        }
    }
}

/// Detected arbitrage opportunity.
///
/// Figures keep full precision; serialization rounds them for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opportunity {
    /// Provider event ID.
    pub event_id: String,
    /// Sport title.
    pub sport: String,
    /// Sport key.
    pub sport_key: String,
    /// Home team.
    pub home_team: String,
    /// Away team.
    pub away_team: String,
    /// Event start (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Home leg.
    pub outcome_a: Leg,
    /// Away leg.
    pub outcome_b: Leg,
    /// Sum of both legs' implied probabilities (< 1).
    #[serde(serialize_with = "serialize_probability")]
    pub implied_probability_sum: Decimal,
    /// Edge in implied-probability space, percent.
    #[serde(serialize_with = "serialize_percent")]
    pub margin_percent: Decimal,
    /// Return on total stake, percent.
    #[serde(serialize_with = "serialize_percent")]
    pub profit_percent: Decimal,
}

/// Evaluate one event's best prices.
///
/// Legs always come from two different bookmakers. When one bookmaker holds
/// the best price on both sides, the cheaper of the two cross-bookmaker
/// pairings is used instead.
pub fn calculate_opportunity(event: &Event, table: &BestPriceTable) -> Option<Opportunity> {
    let home = table.get(Side::Home)?;
    let away = table.get(Side::Away)?;

    let (home_leg, away_leg) = if home.best.quote.bookmaker_id != away.best.quote.bookmaker_id {
        (&home.best, &away.best)
    } else {
        let shared = home.best.quote.bookmaker_id.as_str();
        let keep_home = away.best_excluding(shared).map(|a| (&home.best, a));
        let keep_away = home.best_excluding(shared).map(|h| (h, &away.best));

        match (keep_home, keep_away) {
            (Some(a), Some(b)) => {
                if pair_total(a) <= pair_total(b) {
                    a
                } else {
                    b
                }
            }
            (Some(pair), None) | (None, Some(pair)) => pair,
            (None, None) => return None,
        }
    };

    let metrics = arbitrage_metrics(home_leg.implied_probability, away_leg.implied_probability)?;

    Some(Opportunity {
        event_id: event.event_id.clone(),
        sport: event.sport.clone(),
        sport_key: event.sport_key.clone(),
        home_team: event.home_team.clone(),
        away_team: event.away_team.clone(),
        start_time: event.start_time,
        outcome_a: Leg::from(home_leg),
        outcome_b: Leg::from(away_leg),
        implied_probability_sum: metrics.implied_probability_sum,
        margin_percent: metrics.margin_percent,
        profit_percent: metrics.profit_percent,
    })
}

fn pair_total((home, away): (&PricedQuote, &PricedQuote)) -> Decimal {
    home.implied_probability + away.implied_probability
}
