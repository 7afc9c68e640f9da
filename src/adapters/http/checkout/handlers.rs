//! HTTP handlers for checkout endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::dto::{
    CreateSessionRequest, CreateSessionResponse, VerifySessionParams, VerifySessionResponse,
};
use crate::adapters::http::error::CheckoutApiError;
use crate::adapters::http::state::AppState;
use crate::application::VerifyCheckoutSessionQuery;

/// POST /checkout/create-session
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let result = state.create_checkout.handle(request.into()).await?;
    Ok((StatusCode::CREATED, Json(CreateSessionResponse::from(result))))
}

/// GET /checkout/verify-session?session_id=
///
/// Safe to call repeatedly: subscriptions already materialized by the
/// webhook are reported, not duplicated.
pub async fn verify_session(
    State(state): State<AppState>,
    Query(params): Query<VerifySessionParams>,
) -> Result<Json<VerifySessionResponse>, CheckoutApiError> {
    let query = VerifyCheckoutSessionQuery {
        session_id: params.session_id,
    };
    let result = state.verify_checkout.handle(query).await?;
    Ok(Json(VerifySessionResponse::from(result)))
}
