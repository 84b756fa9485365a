//! End-to-end refresh cycles against a mock odds source.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tokio_test::assert_ok;

use sports_arb::arbitrage::SortKey;
use sports_arb::config::Config;
use sports_arb::odds::{MockEventBuilder, MockOddsSource, OddsApiClient, OddsSource};
use sports_arb::scheduler::{
    RefreshScheduler, RefreshSettings, Snapshot, SnapshotSink, SnapshotStore,
};
use sports_arb::utils::round_for_display;

fn settings(sports: &[&str], sort_key: SortKey) -> RefreshSettings {
    RefreshSettings {
        sports: sports.iter().map(|s| s.to_string()).collect(),
        interval: Duration::from_millis(40),
        fetch_timeout: Duration::from_millis(200),
        sort_key,
        min_profit_percent: Decimal::ZERO,
    }
}

#[derive(Default)]
struct CollectingSink {
    snapshots: Mutex<Vec<Arc<Snapshot>>>,
}

impl SnapshotSink for CollectingSink {
    fn on_snapshot_published(&self, snapshot: &Arc<Snapshot>) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

#[tokio::test]
async fn cycle_publishes_ranked_snapshot() {
    let source = MockOddsSource::new();
    source.set_records(
        "basketball_nba",
        vec![
            MockEventBuilder::new("celtics-heat", "Boston Celtics", "Miami Heat")
                .commence_time("2025-03-02T00:00:00Z")
                .h2h("fanduel", 150, -180)
                .h2h("draftkings", 120, -130)
                .build(),
            MockEventBuilder::new("lakers-suns", "Los Angeles Lakers", "Phoenix Suns")
                .h2h("fanduel", -110, -110)
                .h2h("draftkings", -105, -115)
                .build(),
            json!({ "id": "broken", "home_team": "No Away" }),
        ],
    );
    source.set_records(
        "icehockey_nhl",
        vec![MockEventBuilder::new("bruins-rangers", "Boston Bruins", "New York Rangers")
            .sport("icehockey_nhl", "NHL")
            .commence_time("2025-03-01T23:00:00Z")
            .h2h("betmgm", 105, -150)
            .h2h("caesars", -140, 102)
            .build()],
    );

    let store = Arc::new(SnapshotStore::new());
    let sink = Arc::new(CollectingSink::default());
    assert_ok!(store.add_sink(sink.clone()));
    let scheduler = RefreshScheduler::new(
        Arc::new(source.clone()),
        store.clone(),
        settings(&["basketball_nba", "icehockey_nhl"], SortKey::Margin),
    );

    let report = assert_ok!(scheduler.run_cycle().await);

    assert_eq!(report.events_seen, 4);
    assert_eq!(report.events_skipped, 1);
    assert_eq!(report.opportunities_found, 2);
    assert_eq!(source.calls().len(), 2);

    let snapshot = store.current();
    assert_eq!(snapshot.cycle, 1);
    let ids: Vec<&str> = snapshot.opportunities.iter().map(|o| o.event_id.as_str()).collect();
    // celtics: 0.4 + 0.5652 = 0.9652; bruins: 0.4878 + 0.4950 = 0.9828
    assert_eq!(ids, vec!["celtics-heat", "bruins-rangers"]);

    let top = &snapshot.opportunities[0];
    assert_eq!(top.outcome_a.outcome, "Boston Celtics");
    assert_eq!(top.outcome_a.bookmaker_id, "fanduel");
    assert_eq!(top.outcome_b.outcome, "Miami Heat");
    assert_eq!(top.outcome_b.bookmaker_id, "draftkings");
    assert_eq!(round_for_display(top.margin_percent), dec!(3.48));
    assert_eq!(round_for_display(top.profit_percent), dec!(3.60));

    let json = serde_json::to_value(top).unwrap();
    assert_eq!(json["implied_probability_sum"], 0.9652);
    assert_eq!(json["outcome_a"]["price"], 150.0);

    let seen = sink.snapshots.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(Arc::ptr_eq(&seen[0], &snapshot));
}

#[tokio::test]
async fn time_sort_orders_by_start() {
    let source = MockOddsSource::new();
    source.set_records(
        "basketball_nba",
        vec![
            MockEventBuilder::new("late", "A", "B")
                .commence_time("2025-03-05T00:00:00Z")
                .h2h("fanduel", 150, -200)
                .h2h("draftkings", -200, -130)
                .build(),
            MockEventBuilder::new("early", "C", "D")
                .commence_time("2025-03-01T00:00:00Z")
                .h2h("fanduel", 102, -200)
                .h2h("draftkings", -200, -101)
                .build(),
        ],
    );
    let store = Arc::new(SnapshotStore::new());
    let scheduler = RefreshScheduler::new(
        Arc::new(source),
        store.clone(),
        settings(&["basketball_nba"], SortKey::Time),
    );

    assert_ok!(scheduler.run_cycle().await);

    let ids: Vec<String> = store
        .current()
        .opportunities
        .iter()
        .map(|o| o.event_id.clone())
        .collect();
    assert_eq!(ids, vec!["early", "late"]);
}

#[tokio::test]
async fn snapshots_replace_each_other_without_mutating_readers() {
    let source = MockOddsSource::new();
    source.set_records(
        "basketball_nba",
        vec![MockEventBuilder::new("first", "A", "B")
            .h2h("fanduel", 150, -200)
            .h2h("draftkings", -200, -130)
            .build()],
    );
    let store = Arc::new(SnapshotStore::new());
    let scheduler = RefreshScheduler::new(
        Arc::new(source.clone()),
        store.clone(),
        settings(&["basketball_nba"], SortKey::Margin),
    );

    assert_ok!(scheduler.run_cycle().await);
    let held = store.current();

    source.set_records("basketball_nba", vec![]);
    assert_ok!(scheduler.run_cycle().await);

    assert_eq!(held.cycle, 1);
    assert_eq!(held.opportunities.len(), 1);
    assert_eq!(held.opportunities[0].event_id, "first");
    assert_eq!(store.current().cycle, 2);
    assert!(store.current().opportunities.is_empty());
}

#[tokio::test]
async fn subscriber_follows_running_scheduler() {
    let source = MockOddsSource::new();
    source.set_records(
        "basketball_nba",
        vec![MockEventBuilder::new("e1", "A", "B")
            .h2h("fanduel", 150, -200)
            .h2h("draftkings", -200, -130)
            .build()],
    );
    let store = Arc::new(SnapshotStore::new());
    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::new(source),
        store.clone(),
        settings(&["basketball_nba"], SortKey::Margin),
    ));
    let mut rx = store.subscribe();
    assert!(rx.borrow_and_update().is_initial());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(scheduler.run(shutdown_rx));

    let mut last_cycle = 0;
    for _ in 0..3 {
        assert_ok!(tokio::time::timeout(Duration::from_secs(2), rx.changed()).await);
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.cycle > last_cycle);
        assert_eq!(snapshot.opportunities.len(), 1);
        last_cycle = snapshot.cycle;
    }

    shutdown_tx.send(true).unwrap();
    assert_ok!(handle.await);
}

#[tokio::test]
#[ignore = "requires ODDS_API_KEY and network access"]
async fn live_provider_fetch() {
    let api_key = std::env::var("ODDS_API_KEY").expect("ODDS_API_KEY must be set");
    let config = Config::with_api_key(api_key);
    let client = OddsApiClient::new(&config);

    let records = assert_ok!(client.fetch("upcoming").await);
    let detection = sports_arb::arbitrage::detect_opportunities(&records, "upcoming");

    assert_eq!(detection.events_seen, records.len());
}
