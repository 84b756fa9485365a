//! Unified error types for the arbitrage scanner.

use thiserror::Error;

/// Unified error type for the arbitrage scanner.
#[derive(Error, Debug)]
pub enum ArbError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Odds source error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Malformed event record.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// Refresh scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Odds source failures. Each one costs a single sport its events for one cycle.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The fetch did not resolve within the configured timeout.
    #[error("fetch for {sport} timed out after {timeout_ms}ms")]
    Timeout {
        /// Sport being fetched.
        sport: String,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Provider answered with a non-success status.
    #[error("fetch for {sport} failed: HTTP {status} - {body}")]
    Status {
        /// Sport being fetched.
        sport: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Transport-level failure.
    #[error("request for {sport} failed: {source}")]
    Request {
        /// Sport being fetched.
        sport: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Response body was not a list of event records.
    #[error("failed to decode odds for {sport}: {reason}")]
    Decode {
        /// Sport being fetched.
        sport: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Reasons a single raw event record is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// A required key is absent or has the wrong type.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// `commence_time` is not an RFC 3339 instant.
    #[error("invalid start time `{0}`")]
    InvalidStartTime(String),

    /// Record is not a JSON object.
    #[error("event record is not an object")]
    NotAnObject,

    /// A field has an unexpected shape.
    #[error("malformed event record: {0}")]
    Malformed(String),
}

/// Failures that abort a refresh cycle before anything is published.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A lock guarding shared scheduler state was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ArbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_error_names_sport_and_duration() {
        let err = SourceError::Timeout {
            sport: "basketball_nba".to_string(),
            timeout_ms: 10_000,
        };
        assert_eq!(err.to_string(), "fetch for basketball_nba timed out after 10000ms");
    }

    #[test]
    fn event_error_converts_into_arb_error() {
        let err: ArbError = EventError::MissingField("home_team").into();
        assert_eq!(err.to_string(), "event error: missing required field `home_team`");
    }
}
