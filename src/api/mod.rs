//! HTTP API: opportunities (pull and push), health, status and metrics.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
