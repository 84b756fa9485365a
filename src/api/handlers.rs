//! HTTP API handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::arbitrage::{rank, Opportunity, SortKey};
use crate::scheduler::{CycleReport, CycleState, RefreshScheduler, SportHealth};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Scheduler owning the live snapshot.
    pub scheduler: Arc<RefreshScheduler>,
    /// Prometheus render handle, when metrics are enabled.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(scheduler: Arc<RefreshScheduler>) -> Self {
        Self {
            scheduler,
            prometheus: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_prometheus(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.prometheus = handle;
        self
    }

    /// True once a cycle has published.
    pub fn is_ready(&self) -> bool {
        !self.scheduler.store().current().is_initial()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether a snapshot has been published.
    pub ready: bool,
    /// Cycle of the live snapshot.
    pub cycle: u64,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Scheduler cycle state.
    pub state: CycleState,
    /// Cycle of the live snapshot.
    pub cycle: u64,
    /// When the live snapshot was published.
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// Opportunities in the live snapshot.
    pub opportunities: usize,
    /// Sports fetched each cycle.
    pub sports: Vec<String>,
    /// Report of the last published cycle.
    pub last_cycle: Option<CycleReport>,
    /// Fetch history per sport.
    pub sport_health: Vec<SportHealthEntry>,
}

/// One sport's fetch history.
#[derive(Debug, Serialize)]
pub struct SportHealthEntry {
    /// Sport key.
    pub sport: String,
    /// History.
    #[serde(flatten)]
    pub health: SportHealth,
}

/// Query parameters for the opportunities endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct OpportunitiesQuery {
    /// Sort selector; unknown values fall back to the default.
    pub sort: Option<String>,
    /// Minimum profit percent.
    pub min_profit: Option<Decimal>,
}

/// Opportunities response.
#[derive(Debug, Serialize)]
pub struct OpportunitiesResponse {
    /// Cycle of the snapshot served.
    pub cycle: u64,
    /// When that snapshot was published.
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// Sort applied.
    pub sort: SortKey,
    /// Number of opportunities returned.
    pub count: usize,
    /// Opportunities in ranked order.
    pub opportunities: Vec<Opportunity>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 once a snapshot is published, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.scheduler.store().current();
    let response = ReadyResponse {
        ready: !snapshot.is_initial(),
        cycle: snapshot.cycle,
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns scheduler state and the last cycle report.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.scheduler.store().current();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        state: state.scheduler.state(),
        cycle: snapshot.cycle,
        published_at: snapshot.published_at,
        opportunities: snapshot.opportunities.len(),
        sports: state.scheduler.settings().sports.clone(),
        last_cycle: state.scheduler.last_report(),
        sport_health: state
            .scheduler
            .sport_health()
            .into_iter()
            .map(|(sport, health)| SportHealthEntry { sport, health })
            .collect(),
    })
}

/// Opportunities handler - the live snapshot, optionally re-ranked.
pub async fn opportunities(
    State(state): State<AppState>,
    Query(query): Query<OpportunitiesQuery>,
) -> impl IntoResponse {
    let snapshot = state.scheduler.store().current();
    let settings = state.scheduler.settings();

    let sort = query
        .sort
        .as_deref()
        .map(SortKey::parse_or_default)
        .unwrap_or(settings.sort_key);

    let opportunities = if query.sort.is_none() && query.min_profit.is_none() {
        snapshot.opportunities.clone()
    } else {
        let min_profit = query.min_profit.unwrap_or(settings.min_profit_percent);
        debug!(%sort, %min_profit, "Re-ranking snapshot for request");
        rank(snapshot.opportunities.clone(), sort, min_profit)
    };

    Json(OpportunitiesResponse {
        cycle: snapshot.cycle,
        published_at: snapshot.published_at,
        sort,
        count: opportunities.len(),
        opportunities,
    })
}

/// Server-sent event stream of snapshots.
///
/// Sends the live snapshot on connect, then each newer one. A slow client
/// skips straight to the latest snapshot.
pub async fn opportunities_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.scheduler.store().subscribe();

    let stream = async_stream::stream! {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            match Event::default().event("snapshot").json_data(&*snapshot) {
                Ok(event) => yield Ok(event),
                Err(e) => warn!(cycle = snapshot.cycle, "Failed to encode snapshot event: {}", e),
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Prometheus metrics handler - 404 when metrics are disabled.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
