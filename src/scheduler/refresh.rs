//! Periodic refresh cycle: fetch, evaluate, rank, publish.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use super::snapshot::SnapshotStore;
use crate::arbitrage::{detect_opportunities, rank, Detection, SortKey};
use crate::config::Config;
use crate::error::{SchedulerError, SourceError};
use crate::metrics;
use crate::odds::OddsSource;

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CycleState {
    /// Not running, or sleeping before the first tick.
    Idle,
    /// Waiting on per-sport fetches.
    Fetching,
    /// Normalizing, evaluating and ranking.
    Evaluating,
    /// Snapshot published; sleeping until the next tick.
    Published,
}

/// Outcome of fetching one sport.
#[derive(Debug)]
pub enum SportFetch {
    /// Records returned by the source.
    Fetched {
        /// Sport key.
        sport: String,
        /// Raw event records.
        records: Vec<Value>,
    },
    /// Fetch failed or timed out.
    Failed {
        /// Sport key.
        sport: String,
        /// Why.
        error: SourceError,
    },
}

/// A sport that contributed nothing this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SportFailure {
    /// Sport key.
    pub sport: String,
    /// Failure description.
    pub reason: String,
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    /// Cycle number of the published snapshot.
    pub cycle: u64,
    /// Sports fetched successfully.
    pub sports_ok: Vec<String>,
    /// Sports that failed.
    pub sports_failed: Vec<SportFailure>,
    /// Records examined.
    pub events_seen: usize,
    /// Records skipped as malformed.
    pub events_skipped: usize,
    /// Opportunities found before filtering.
    pub opportunities_found: usize,
    /// Opportunities in the published snapshot.
    pub opportunities_published: usize,
    /// Wall time of the cycle.
    pub elapsed_ms: u64,
    /// Every configured sport failed.
    pub all_sources_failed: bool,
}

/// Per-sport fetch history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SportHealth {
    /// Last successful fetch.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success: Option<OffsetDateTime>,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Most recent error, cleared on success.
    pub last_error: Option<String>,
}

/// Scheduler parameters.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Sports fetched every cycle, in discovery order.
    pub sports: Vec<String>,
    /// Time between cycle starts.
    pub interval: Duration,
    /// Per-sport fetch timeout.
    pub fetch_timeout: Duration,
    /// Snapshot ordering.
    pub sort_key: SortKey,
    /// Minimum profit percent kept in the snapshot.
    pub min_profit_percent: Decimal,
}

impl RefreshSettings {
    /// Settings from application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            sports: config.sport_keys(),
            interval: config.refresh_interval(),
            fetch_timeout: config.fetch_timeout(),
            sort_key: config.sort_key(),
            min_profit_percent: config.min_profit_percent,
        }
    }
}

/// Drives the refresh cycle and owns the snapshot store.
pub struct RefreshScheduler {
    source: Arc<dyn OddsSource>,
    store: Arc<SnapshotStore>,
    settings: RefreshSettings,
    state: watch::Sender<CycleState>,
    last_report: RwLock<Option<CycleReport>>,
    sport_health: DashMap<String, SportHealth>,
}

impl RefreshScheduler {
    /// Create a scheduler publishing into `store`.
    pub fn new(
        source: Arc<dyn OddsSource>,
        store: Arc<SnapshotStore>,
        settings: RefreshSettings,
    ) -> Self {
        let (state, _rx) = watch::channel(CycleState::Idle);
        Self {
            source,
            store,
            settings,
            state,
            last_report: RwLock::new(None),
            sport_health: DashMap::new(),
        }
    }

    /// Snapshot store this scheduler publishes into.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Scheduler parameters.
    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    /// Current cycle state.
    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    /// Report of the last published cycle.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().ok().and_then(|r| r.clone())
    }

    /// Fetch history per sport, sorted by sport key.
    pub fn sport_health(&self) -> Vec<(String, SportHealth)> {
        let mut health: Vec<(String, SportHealth)> = self
            .sport_health
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        health.sort_by(|a, b| a.0.cmp(&b.0));
        health
    }

    fn set_state(&self, state: CycleState) {
        self.state.send_replace(state);
    }

    /// Fetch every configured sport concurrently.
    ///
    /// Results are in configured order. A failing or slow sport never
    /// cancels the others.
    #[instrument(skip(self), fields(sports = self.settings.sports.len()))]
    pub async fn fetch_all(&self) -> Vec<SportFetch> {
        let timeout = self.settings.fetch_timeout;

        let fetches = self.settings.sports.iter().map(|sport| async move {
            match tokio::time::timeout(timeout, self.source.fetch(sport)).await {
                Ok(Ok(records)) => SportFetch::Fetched {
                    sport: sport.clone(),
                    records,
                },
                Ok(Err(error)) => SportFetch::Failed {
                    sport: sport.clone(),
                    error,
                },
                Err(_) => SportFetch::Failed {
                    sport: sport.clone(),
                    error: SourceError::Timeout {
                        sport: sport.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    },
                },
            }
        });

        join_all(fetches).await
    }

    /// Run one full cycle and publish its snapshot.
    ///
    /// Source and event failures only shrink the snapshot. An error here
    /// means nothing was published and the previous snapshot is still live.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport, SchedulerError> {
        let timer = metrics::timer_cycle();
        let started = Instant::now();

        self.set_state(CycleState::Fetching);
        let fetches = self.fetch_all().await;

        self.set_state(CycleState::Evaluating);
        let mut report = CycleReport::default();
        let mut detection = Detection::default();

        for fetch in fetches {
            match fetch {
                SportFetch::Fetched { sport, records } => {
                    let found = detect_opportunities(&records, &sport);
                    info!(
                        sport = %sport,
                        events = found.events_seen,
                        skipped = found.events_skipped,
                        opportunities = found.opportunities.len(),
                        "Sport evaluated"
                    );
                    self.record_success(&sport);
                    detection.merge(found);
                    report.sports_ok.push(sport);
                }
                SportFetch::Failed { sport, error } => {
                    warn!(sport = %sport, error = %error, "Odds fetch failed, sport skipped this cycle");
                    metrics::inc_source_failures(&sport);
                    self.record_failure(&sport, &error);
                    report.sports_failed.push(SportFailure {
                        sport,
                        reason: error.to_string(),
                    });
                }
            }
        }

        report.events_seen = detection.events_seen;
        report.events_skipped = detection.events_skipped;
        report.opportunities_found = detection.opportunities.len();
        report.all_sources_failed = report.sports_ok.is_empty() && !report.sports_failed.is_empty();

        let ranked = rank(
            detection.opportunities,
            self.settings.sort_key,
            self.settings.min_profit_percent,
        );

        let snapshot = match self.store.publish(ranked) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.set_state(CycleState::Idle);
                return Err(e);
            }
        };
        self.set_state(CycleState::Published);

        report.cycle = snapshot.cycle;
        report.opportunities_published = snapshot.opportunities.len();
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        metrics::inc_cycles();
        metrics::add_events_skipped(report.events_skipped);
        metrics::add_opportunities_detected(report.opportunities_found);
        metrics::set_opportunities_published(report.opportunities_published);

        if report.all_sources_failed {
            error!(
                cycle = report.cycle,
                failed = report.sports_failed.len(),
                "All odds sources failed, published empty snapshot"
            );
        } else if report.opportunities_published == 0 {
            info!(
                cycle = report.cycle,
                events = report.events_seen,
                elapsed_ms = timer.elapsed_ms() as u64,
                "No arbitrage opportunities this cycle"
            );
        } else {
            info!(
                cycle = report.cycle,
                events = report.events_seen,
                opportunities = report.opportunities_published,
                elapsed_ms = timer.elapsed_ms() as u64,
                "Snapshot published"
            );
        }

        if let Ok(mut last) = self.last_report.write() {
            *last = Some(report.clone());
        }

        Ok(report)
    }

    /// Run cycles on the configured interval until `shutdown` flips or closes.
    ///
    /// A cycle in flight at shutdown is dropped before it publishes.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            sports = ?self.settings.sports,
            interval_secs = self.settings.interval.as_secs(),
            sort = %self.settings.sort_key,
            "Refresh scheduler started"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        error!("Refresh cycle aborted, previous snapshot kept: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Shutdown during refresh cycle, abandoning it");
                    break;
                }
            }
        }

        self.set_state(CycleState::Idle);
        info!("Refresh scheduler stopped");
    }

    fn record_success(&self, sport: &str) {
        let mut health = self.sport_health.entry(sport.to_string()).or_default();
        health.last_success = Some(OffsetDateTime::now_utc());
        health.consecutive_failures = 0;
        health.last_error = None;
    }

    fn record_failure(&self, sport: &str, error: &SourceError) {
        let mut health = self.sport_health.entry(sport.to_string()).or_default();
        health.consecutive_failures += 1;
        health.last_error = Some(error.to_string());
    }
}
