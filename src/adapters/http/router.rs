//! Application router.

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::checkout::checkout_routes;
use super::health::health;
use super::state::AppState;
use super::webhook::webhook_routes;

/// Request limits applied by the router.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub max_webhook_body_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_webhook_body_bytes: 64 * 1024,
        }
    }
}

/// Build the complete router with tracing and request timeouts.
pub fn app_router(state: AppState, limits: HttpLimits) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(webhook_routes(limits.max_webhook_body_bytes))
        .merge(checkout_routes())
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
