//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    health, metrics, opportunities, opportunities_stream, ready, status, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status endpoint
        .route("/api/v1/status", get(status))
        // Opportunities
        .route("/api/v1/opportunities", get(opportunities))
        .route("/api/v1/opportunities/stream", get(opportunities_stream))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{Leg, Opportunity, SortKey};
    use crate::odds::MockOddsSource;
    use crate::scheduler::{RefreshScheduler, RefreshSettings, SnapshotStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use futures::StreamExt;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use time::macros::datetime;
    use time::OffsetDateTime;
    use tower::ServiceExt;

    fn state() -> AppState {
        let scheduler = RefreshScheduler::new(
            Arc::new(MockOddsSource::new()),
            Arc::new(SnapshotStore::new()),
            RefreshSettings {
                sports: vec!["basketball_nba".to_string()],
                interval: Duration::from_secs(30),
                fetch_timeout: Duration::from_secs(10),
                sort_key: SortKey::Margin,
                min_profit_percent: Decimal::ZERO,
            },
        );
        AppState::new(Arc::new(scheduler))
    }

    fn opp(id: &str, start: OffsetDateTime, margin: Decimal, profit: Decimal) -> Opportunity {
        let leg = |outcome: &str, bookmaker: &str| Leg {
            outcome: outcome.to_string(),
            bookmaker_id: bookmaker.to_string(),
            bookmaker: bookmaker.to_uppercase(),
            price: dec!(150),
            url: None,
        };
        Opportunity {
            event_id: id.to_string(),
            sport: "NBA".to_string(),
            sport_key: "basketball_nba".to_string(),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            start_time: start,
            outcome_a: leg("Home", "fanduel"),
            outcome_b: leg("Away", "draftkings"),
            implied_probability_sum: Decimal::ONE - margin / dec!(100),
            margin_percent: margin,
            profit_percent: profit,
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn event_ids(body: &Value) -> Vec<String> {
        body["opportunities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["event_id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_before_first_cycle() {
        let (status, body) = get_json(create_router(state()), "/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_after_publish() {
        let state = state();
        state.scheduler.store().publish(vec![]).unwrap();

        let (status, body) = get_json(create_router(state), "/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cycle"], 1);
    }

    #[tokio::test]
    async fn opportunities_serves_snapshot_with_display_rounding() {
        let state = state();
        state
            .scheduler
            .store()
            .publish(vec![opp(
                "e1",
                datetime!(2025-03-01 00:30 UTC),
                dec!(3.478260869565217391304347826),
                dec!(3.603603603603603603603603604),
            )])
            .unwrap();

        let (status, body) = get_json(create_router(state), "/api/v1/opportunities").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cycle"], 1);
        assert_eq!(body["count"], 1);
        assert_eq!(body["sort"], "margin");
        let first = &body["opportunities"][0];
        assert_eq!(first["margin_percent"], 3.48);
        assert_eq!(first["profit_percent"], 3.6);
        assert_eq!(first["start_time"], "2025-03-01T00:30:00Z");
    }

    #[tokio::test]
    async fn opportunities_reranks_per_request() {
        let state = state();
        state
            .scheduler
            .store()
            .publish(vec![
                opp("big", datetime!(2025-03-03 00:00 UTC), dec!(3), dec!(3.09)),
                opp("early", datetime!(2025-03-01 00:00 UTC), dec!(1), dec!(1.01)),
                opp("tiny", datetime!(2025-03-02 00:00 UTC), dec!(0.2), dec!(0.2)),
            ])
            .unwrap();

        let (_, by_time) =
            get_json(create_router(state.clone()), "/api/v1/opportunities?sort=time").await;
        assert_eq!(event_ids(&by_time), vec!["early", "tiny", "big"]);

        let (_, filtered) = get_json(
            create_router(state.clone()),
            "/api/v1/opportunities?sort=nonsense&min_profit=1",
        )
        .await;
        assert_eq!(filtered["sort"], "margin");
        assert_eq!(event_ids(&filtered), vec!["big", "early"]);

        // the live snapshot is untouched
        assert_eq!(state.scheduler.store().current().opportunities[0].event_id, "big");
    }

    #[tokio::test]
    async fn status_reports_scheduler_state() {
        let (status, body) = get_json(create_router(state()), "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "starting");
        assert_eq!(body["state"], "idle");
        assert_eq!(body["cycle"], 0);
        assert_eq!(body["sports"][0], "basketball_nba");
        assert!(body["last_cycle"].is_null());
    }

    #[tokio::test]
    async fn metrics_disabled_returns_404() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stream_sends_current_snapshot_first() {
        let state = state();
        state
            .scheduler
            .store()
            .publish(vec![opp("e1", datetime!(2025-03-01 00:00 UTC), dec!(2), dec!(2.04))])
            .unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/opportunities/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.starts_with("event: snapshot"));
        assert!(text.contains("\"cycle\":1"));
        assert!(text.contains("\"event_id\":\"e1\""));
    }
}
