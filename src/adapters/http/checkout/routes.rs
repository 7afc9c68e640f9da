//! Axum router configuration for checkout endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{create_session, verify_session};
use crate::adapters::http::state::AppState;

/// # Routes
/// - `POST /checkout/create-session`
/// - `GET /checkout/verify-session`
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/create-session", post(create_session))
        .route("/checkout/verify-session", get(verify_session))
}
