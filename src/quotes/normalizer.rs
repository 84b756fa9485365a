//! Raw record parsing and best-price selection.

use rust_decimal::Decimal;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::types::{BestPriceTable, Event, OutcomeQuote, PricedQuote, Side, SideBest};
use crate::arbitrage::calculator::implied_probability;
use crate::error::EventError;
use crate::odds::types::{MarketKey, RawEvent};

/// Parse a price sent as a JSON number or numeric string.
pub fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Build an [`Event`] from one raw provider record.
///
/// `requested_sport` stands in for a missing `sport_key`. Only head-to-head
/// quotes on the home or away outcome are kept; quotes whose price cannot be
/// read are dropped.
pub fn parse_event(record: &Value, requested_sport: &str) -> Result<Event, EventError> {
    if !record.is_object() {
        return Err(EventError::NotAnObject);
    }
    let raw: RawEvent =
        serde_json::from_value(record.clone()).map_err(|e| EventError::Malformed(e.to_string()))?;

    let home_team = required(raw.home_team, "home_team")?;
    let away_team = required(raw.away_team, "away_team")?;
    let sport = required(raw.sport_title, "sport_title")?;
    let commence_time = required(raw.commence_time, "commence_time")?;
    let start_time = OffsetDateTime::parse(&commence_time, &Rfc3339)
        .map_err(|_| EventError::InvalidStartTime(commence_time.clone()))?;

    let sport_key = raw
        .sport_key
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| requested_sport.to_string());
    let event_id = raw
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("{sport_key}:{home_team}:{away_team}:{commence_time}"));

    let mut quotes = Vec::new();
    let mut three_way = false;

    for bookmaker in &raw.bookmakers {
        let Some(bookmaker_id) = bookmaker.key.as_deref().filter(|k| !k.is_empty()) else {
            continue;
        };
        let title = bookmaker.title.as_deref().unwrap_or(bookmaker_id);

        for market in &bookmaker.markets {
            if market.market_key() != Some(MarketKey::H2h) {
                continue;
            }

            for outcome in &market.outcomes {
                let Some(name) = outcome.name.as_deref() else {
                    continue;
                };
                if name != home_team && name != away_team {
                    three_way = true;
                    continue;
                }
                let Some(price) = parse_price(&outcome.price) else {
                    debug!(bookmaker = bookmaker_id, outcome = name, "Unreadable price, quote dropped");
                    continue;
                };

                quotes.push(OutcomeQuote {
                    bookmaker_id: bookmaker_id.to_string(),
                    bookmaker: title.to_string(),
                    outcome_name: name.to_string(),
                    price,
                    source_url: outcome
                        .link
                        .clone()
                        .or_else(|| market.link.clone())
                        .or_else(|| bookmaker.link.clone()),
                });
            }
        }
    }

    Ok(Event {
        event_id,
        sport_key,
        sport,
        home_team,
        away_team,
        start_time,
        quotes,
        three_way,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, EventError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(EventError::MissingField(field))
}

/// Select the most favorable quote per side.
///
/// Favorable means lowest implied probability, so `-105` beats `-130` and
/// `+150` beats `+120`. Zero prices are excluded. Ties keep the quote seen
/// first. Events whose h2h market has a third outcome get an empty table,
/// since a two-leg bet does not cover the draw.
#[instrument(skip(event), fields(event_id = %event.event_id))]
pub fn best_price_table(event: &Event) -> BestPriceTable {
    if event.three_way {
        debug!("Three-way market, not priced");
        return BestPriceTable::default();
    }

    BestPriceTable {
        home: best_for_side(event, Side::Home),
        away: best_for_side(event, Side::Away),
    }
}

fn best_for_side(event: &Event, side: Side) -> Option<SideBest> {
    let name = event.outcome_name(side);
    let mut best: Option<PricedQuote> = None;
    let mut runner_up: Option<PricedQuote> = None;

    let priced = event
        .quotes
        .iter()
        .filter(|q| q.outcome_name == name)
        .filter_map(|q| {
            implied_probability(q.price).map(|p| PricedQuote {
                quote: q.clone(),
                implied_probability: p,
            })
        });

    for candidate in priced {
        match &best {
            None => best = Some(candidate),
            Some(current) if candidate.implied_probability < current.implied_probability => {
                // A displaced best from the same bookmaker leaves the runner-up as is.
                if candidate.quote.bookmaker_id != current.quote.bookmaker_id {
                    runner_up = best.take();
                }
                best = Some(candidate);
            }
            Some(current) => {
                if candidate.quote.bookmaker_id != current.quote.bookmaker_id
                    && runner_up
                        .as_ref()
                        .map_or(true, |r| candidate.implied_probability < r.implied_probability)
                {
                    runner_up = Some(candidate);
                }
            }
        }
    }

    best.map(|best| SideBest { best, runner_up })
}
