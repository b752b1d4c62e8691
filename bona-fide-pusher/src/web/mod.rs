//! Web server module for REMS event notifications.
//!
//! REMS calls the relay with `PUT` on whatever path it was configured with,
//! so every path except `/health` routes to the event handler.

pub mod handlers;
pub mod server;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{event_notification, health, AppState, HealthResponse, RelayResponse};
pub use server::{serve, ConnectionFault};

/// Build the relay router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", put(event_notification))
        .route("/*path", put(event_notification))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
