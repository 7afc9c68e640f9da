//! Error response bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::CheckoutError;
use crate::domain::webhook::WebhookError;

/// Standard error body: `{ "error": CODE, "message": ... }`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error: String,
    /// Human-readable message, omitted for server-side failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn code(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
        }
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Webhook failures never echo event detail back to the sender.
pub struct WebhookApiError(pub WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        ErrorResponse::code(self.0.code()).into_response_with(self.0.status_code())
    }
}

/// API error type that converts checkout errors to HTTP responses.
pub struct CheckoutApiError(pub CheckoutError);

impl From<CheckoutError> for CheckoutApiError {
    fn from(err: CheckoutError) -> Self {
        Self(err)
    }
}

impl IntoResponse for CheckoutApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = if self.0.is_internal() {
            tracing::error!(code = self.0.code(), "Checkout request failed: {}", self.0);
            ErrorResponse::code(self.0.code())
        } else {
            ErrorResponse::new(self.0.code(), self.0.to_string())
        };
        body.into_response_with(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayError;

    #[test]
    fn internal_checkout_errors_hide_their_message() {
        let response =
            CheckoutApiError(CheckoutError::Store("db password wrong".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn webhook_errors_use_their_status() {
        let response = WebhookApiError(WebhookError::InvalidSignature).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = WebhookApiError(WebhookError::Timeout).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn gateway_failures_map_to_bad_gateway() {
        let err = CheckoutError::Gateway(GatewayError::network("reset"));
        let response = CheckoutApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn code_only_body_omits_message() {
        let json = serde_json::to_value(ErrorResponse::code("TIMEOUT")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "TIMEOUT" }));
    }
}
