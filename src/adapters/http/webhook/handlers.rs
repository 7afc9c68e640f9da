//! HTTP handler for webhook deliveries.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::dto::WebhookAck;
use crate::adapters::http::error::{ErrorResponse, WebhookApiError};
use crate::adapters::http::state::AppState;
use crate::application::{ProcessWebhookCommand, WebhookReceipt};
use crate::domain::webhook::WebhookError;

/// Header carrying the signature for a provider, e.g. `stripe-signature`.
pub fn signature_header_name(provider: &str) -> String {
    format!("{}-signature", provider.to_ascii_lowercase())
}

/// POST /api/webhooks/:provider
///
/// The body is taken as raw bytes; the signature covers the exact bytes
/// sent, so it must not be parsed before verification.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Some(handler) = state.webhook_handler(&provider) else {
        tracing::warn!(provider = %provider, "Webhook for unknown provider");
        return ErrorResponse::code("UNKNOWN_PROVIDER").into_response_with(StatusCode::NOT_FOUND);
    };

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(
                provider = %provider,
                status = %rejection.status(),
                "Failed to read webhook body: {}",
                rejection.body_text()
            );
            return ErrorResponse::code("BODY_READ_FAILED")
                .into_response_with(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    let header_name = signature_header_name(&provider);
    let signature = match headers
        .get(header_name.as_str())
        .and_then(|value| value.to_str().ok())
    {
        Some(signature) => signature.to_string(),
        None => {
            tracing::warn!(security = true, provider = %provider, "Webhook missing signature header");
            return WebhookApiError(WebhookError::MalformedHeader(format!(
                "missing {} header",
                header_name
            )))
            .into_response();
        }
    };

    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match handler.handle(cmd).await {
        Ok(receipt) => {
            if let WebhookReceipt::Dispatched { event_id, outcome } = &receipt {
                tracing::debug!(provider = %provider, event_id = %event_id, outcome = ?outcome, "Webhook acknowledged");
            }
            (StatusCode::OK, Json(WebhookAck::received())).into_response()
        }
        Err(err) => WebhookApiError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_header_is_derived_from_provider() {
        assert_eq!(signature_header_name("stripe"), "stripe-signature");
        assert_eq!(signature_header_name("Stripe"), "stripe-signature");
    }

    #[test]
    fn ack_serializes_as_received_true() {
        let json = serde_json::to_value(WebhookAck::received()).unwrap();
        assert_eq!(json, serde_json::json!({ "received": true }));
    }
}
