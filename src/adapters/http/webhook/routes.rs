//! Axum router configuration for webhook endpoints.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use super::handlers::receive_webhook;
use crate::adapters::http::state::AppState;

/// Webhook routes. Signature verified, no user authentication.
///
/// # Routes
/// - `POST /api/webhooks/:provider`
pub fn webhook_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/webhooks/:provider", post(receive_webhook))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}
