//! Per-event arbitrage detection.

use serde_json::Value;
use tracing::{debug, info};

use super::calculator::{calculate_opportunity, Opportunity};
use crate::error::EventError;
use crate::quotes::{best_price_table, parse_event};

/// Result of evaluating one raw event record.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Best prices sum below 100%.
    Opportunity(Opportunity),
    /// Event parsed but offers no arbitrage (or lacks a side).
    NoOpportunity,
    /// Record was malformed and skipped.
    Skipped(EventError),
}

/// Normalize and evaluate one raw record.
pub fn check_event(record: &Value, sport: &str) -> EventOutcome {
    let event = match parse_event(record, sport) {
        Ok(event) => event,
        Err(e) => {
            debug!(sport, error = %e, "Skipping malformed event");
            return EventOutcome::Skipped(e);
        }
    };

    let table = best_price_table(&event);
    if !table.is_complete() {
        debug!(event_id = %event.event_id, sides = table.len(), "Event lacks a priced side");
        return EventOutcome::NoOpportunity;
    }

    match calculate_opportunity(&event, &table) {
        Some(opp) => {
            info!(
                event_id = %opp.event_id,
                matchup = %event.matchup(),
                home = %opp.outcome_a.bookmaker,
                away = %opp.outcome_b.bookmaker,
                margin_pct = %opp.margin_percent.round_dp(4),
                profit_pct = %opp.profit_percent.round_dp(4),
                "Arbitrage opportunity detected"
            );
            EventOutcome::Opportunity(opp)
        }
        None => EventOutcome::NoOpportunity,
    }
}

/// Aggregate of evaluating a batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// Opportunities in discovery order.
    pub opportunities: Vec<Opportunity>,
    /// Records examined.
    pub events_seen: usize,
    /// Records skipped as malformed.
    pub events_skipped: usize,
}

impl Detection {
    /// Fold one outcome in.
    pub fn push(&mut self, outcome: EventOutcome) {
        self.events_seen += 1;
        match outcome {
            EventOutcome::Opportunity(opp) => self.opportunities.push(opp),
            EventOutcome::NoOpportunity => {}
            EventOutcome::Skipped(_) => self.events_skipped += 1,
        }
    }

    /// Append another batch, keeping its order after ours.
    pub fn merge(&mut self, other: Detection) {
        self.opportunities.extend(other.opportunities);
        self.events_seen += other.events_seen;
        self.events_skipped += other.events_skipped;
    }
}

/// Evaluate every record of one sport, preserving order.
pub fn detect_opportunities(records: &[Value], sport: &str) -> Detection {
    let mut detection = Detection::default();
    for record in records {
        detection.push(check_event(record, sport));
    }
    detection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::MockEventBuilder;
    use crate::utils::round_for_display;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn check_event_finds_opportunity() {
        let record = MockEventBuilder::new("e1", "Boston Celtics", "Miami Heat")
            .h2h("fanduel", 150, -180)
            .h2h("draftkings", 120, -130)
            .build();

        let EventOutcome::Opportunity(opp) = check_event(&record, "basketball_nba") else {
            panic!("expected opportunity");
        };

        assert_eq!(opp.outcome_a.bookmaker_id, "fanduel");
        assert_eq!(opp.outcome_a.url.as_deref(), Some("https://sportsbook.example/fanduel"));
        assert_eq!(opp.outcome_b.bookmaker_id, "draftkings");
        assert_eq!(round_for_display(opp.margin_percent), dec!(3.48));
    }

    #[test]
    fn check_event_returns_none_when_juiced() {
        let record = MockEventBuilder::new("e1", "A", "B")
            .h2h("fanduel", -110, -110)
            .h2h("draftkings", -115, -105)
            .build();

        assert_eq!(check_event(&record, "basketball_nba"), EventOutcome::NoOpportunity);
    }

    #[test]
    fn missing_side_never_produces_opportunity() {
        let record = MockEventBuilder::new("e1", "A", "B")
            .market("fanduel", "h2h", &[("A", json!(100000))])
            .build();

        assert_eq!(check_event(&record, "basketball_nba"), EventOutcome::NoOpportunity);
    }

    #[test]
    fn zero_price_side_produces_nothing() {
        let record = MockEventBuilder::new("e1", "A", "B")
            .h2h("fanduel", 0, 500)
            .build();

        assert_eq!(check_event(&record, "basketball_nba"), EventOutcome::NoOpportunity);
    }

    #[test]
    fn malformed_event_does_not_stop_the_batch() {
        let good = MockEventBuilder::new("good", "A", "B")
            .h2h("fanduel", 150, -180)
            .h2h("draftkings", 120, -130)
            .build();
        let bad = json!({ "id": "bad", "sport_title": "NBA" });

        let detection = detect_opportunities(&[bad, good, json!("garbage")], "basketball_nba");

        assert_eq!(detection.events_seen, 3);
        assert_eq!(detection.events_skipped, 2);
        assert_eq!(detection.opportunities.len(), 1);
        assert_eq!(detection.opportunities[0].event_id, "good");
    }

    #[test]
    fn out_of_range_price_is_dropped_without_aborting_batch() {
        let huge = MockEventBuilder::new("huge", "A", "B")
            .market(
                "fanduel",
                "h2h",
                &[("A", json!("79228162514264337593543950335")), ("B", json!(-110))],
            )
            .h2h("draftkings", -120, 105)
            .build();
        let good = MockEventBuilder::new("good", "C", "D")
            .h2h("fanduel", 150, -180)
            .h2h("draftkings", 120, -130)
            .build();

        let detection = detect_opportunities(&[huge, good], "basketball_nba");

        assert_eq!(detection.events_seen, 2);
        assert_eq!(detection.events_skipped, 0);
        assert_eq!(detection.opportunities.len(), 1);
        assert_eq!(detection.opportunities[0].event_id, "good");
    }
}
