//! Small shared helpers: shutdown signal and display rounding.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;
use tracing::info;

/// Decimal places shown for percentages.
pub const PERCENT_DP: u32 = 2;

/// Decimal places shown for probabilities.
pub const PROBABILITY_DP: u32 = 4;

/// Round a figure to two places, half away from zero.
pub fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Serialize a percentage as a JSON number rounded to two places.
pub fn serialize_percent<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_for_display(*value).to_f64().unwrap_or_default())
}

/// Serialize a probability as a JSON number rounded to four places.
pub fn serialize_probability<S: Serializer>(
    value: &Decimal,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let rounded = value.round_dp_with_strategy(PROBABILITY_DP, RoundingStrategy::MidpointAwayFromZero);
    serializer.serialize_f64(rounded.to_f64().unwrap_or_default())
}

/// Serialize a decimal as a JSON number.
pub fn serialize_decimal<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.to_f64().unwrap_or_default())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
