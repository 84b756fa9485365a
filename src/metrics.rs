//! Prometheus metrics for refresh cycles and source health.
//!
//! This module provides metrics for:
//! - Refresh cycle duration
//! - Per-sport odds fetch latency and failures
//! - Skipped events and detected/published opportunities

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, warn};

// === Metric Name Constants ===

/// Refresh cycle duration metric name.
pub const METRIC_CYCLE_DURATION: &str = "cycle_duration_ms";
/// Odds fetch latency metric name.
pub const METRIC_FETCH_LATENCY: &str = "odds_fetch_latency_ms";
/// Completed cycles counter metric name.
pub const METRIC_CYCLES: &str = "cycles_total";
/// Source failures counter metric name.
pub const METRIC_SOURCE_FAILURES: &str = "source_failures_total";
/// Skipped events counter metric name.
pub const METRIC_EVENTS_SKIPPED: &str = "events_skipped_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Opportunities in the live snapshot gauge metric name.
pub const METRIC_OPPORTUNITIES_PUBLISHED: &str = "opportunities_published";

/// Install the Prometheus recorder and return its render handle.
pub fn install_prometheus() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(METRIC_CYCLE_DURATION, "Refresh cycle duration in milliseconds");
    describe_histogram!(METRIC_FETCH_LATENCY, "Odds fetch latency per sport in milliseconds");

    describe_counter!(METRIC_CYCLES, "Total number of published refresh cycles");
    describe_counter!(METRIC_SOURCE_FAILURES, "Total number of failed sport fetches");
    describe_counter!(METRIC_EVENTS_SKIPPED, "Total number of malformed events skipped");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );

    describe_gauge!(
        METRIC_OPPORTUNITIES_PUBLISHED,
        "Opportunities in the live snapshot"
    );

    debug!("Metrics initialized");
}

/// Record odds fetch latency for a sport.
pub fn record_fetch_latency(start: Instant, sport: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FETCH_LATENCY, "sport" => sport.to_string()).record(latency_ms);
}

/// Increment completed cycles counter.
pub fn inc_cycles() {
    counter!(METRIC_CYCLES).increment(1);
}

/// Increment source failures counter for a sport.
pub fn inc_source_failures(sport: &str) {
    counter!(METRIC_SOURCE_FAILURES, "sport" => sport.to_string()).increment(1);
}

/// Add to skipped events counter.
pub fn add_events_skipped(count: usize) {
    counter!(METRIC_EVENTS_SKIPPED).increment(count as u64);
}

/// Add to opportunities detected counter.
pub fn add_opportunities_detected(count: usize) {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(count as u64);
}

/// Set the published opportunities gauge.
pub fn set_opportunities_published(count: usize) {
    gauge!(METRIC_OPPORTUNITIES_PUBLISHED).set(count as f64);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a refresh cycle.
pub fn timer_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_CYCLE_DURATION)
}
