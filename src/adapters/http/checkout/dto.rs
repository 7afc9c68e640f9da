//! HTTP DTOs for checkout endpoints.
//!
//! JSON bodies use camelCase to match the embedded checkout client.

use serde::{Deserialize, Serialize};

use crate::application::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionResult, VerifyCheckoutSessionResult,
};
use crate::domain::billing::{CheckoutStatus, LineItemFailure, Subscription, SubscriptionStatus};
use crate::domain::foundation::{CustomerId, PriceId, Timestamp};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub price_id: PriceId,
    pub customer_id: CustomerId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub return_url: String,
}

fn default_quantity() -> u32 {
    1
}

impl From<CreateSessionRequest> for CreateCheckoutSessionCommand {
    fn from(request: CreateSessionRequest) -> Self {
        Self {
            price_id: request.price_id,
            customer_id: request.customer_id,
            quantity: request.quantity,
            return_url: request.return_url,
        }
    }
}

/// Query string of the verify endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifySessionParams {
    pub session_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub client_secret: String,
    pub session_id: String,
}

impl From<CreateCheckoutSessionResult> for CreateSessionResponse {
    fn from(result: CreateCheckoutSessionResult) -> Self {
        Self {
            client_secret: result.client_secret,
            session_id: result.session_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySessionResponse {
    pub session_id: String,
    pub status: CheckoutStatus,
    pub subscriptions: Vec<SubscriptionSummary>,
    pub failures: Vec<LineItemFailureResponse>,
}

impl From<VerifyCheckoutSessionResult> for VerifySessionResponse {
    fn from(result: VerifyCheckoutSessionResult) -> Self {
        Self {
            session_id: result.session_id,
            status: result.status,
            subscriptions: result
                .report
                .subscriptions()
                .map(SubscriptionSummary::from)
                .collect(),
            failures: result
                .report
                .failures
                .iter()
                .map(LineItemFailureResponse::from)
                .collect(),
        }
    }
}

/// Subscription as seen by the checkout client. Timestamps are RFC 3339.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    pub price_id: String,
    pub remote_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub quantity: u32,
    pub current_period_start: String,
    pub current_period_end: String,
    pub next_delivery_date: String,
    pub cancel_at_period_end: bool,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            customer_id: sub.customer_id.to_string(),
            product_id: sub.product_id.to_string(),
            price_id: sub.price_id.to_string(),
            remote_subscription_id: sub.remote_subscription_id.clone(),
            status: sub.status,
            quantity: sub.quantity,
            current_period_start: rfc3339(sub.period.start()),
            current_period_end: rfc3339(sub.period.end()),
            next_delivery_date: rfc3339(sub.next_delivery_date),
            cancel_at_period_end: sub.cancel_at_period_end,
        }
    }
}

/// Line item that could not be materialized. Internal detail is not exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemFailureResponse {
    pub remote_price_id: String,
    pub retryable: bool,
}

impl From<&LineItemFailure> for LineItemFailureResponse {
    fn from(failure: &LineItemFailure) -> Self {
        Self {
            remote_price_id: failure.remote_price_id.clone(),
            retryable: failure.retryable,
        }
    }
}

fn rfc3339(ts: Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults_quantity_to_one() {
        let json = serde_json::json!({
            "priceId": PriceId::new().to_string(),
            "customerId": CustomerId::new().to_string(),
            "returnUrl": "https://shop.example.com/return"
        });
        let request: CreateSessionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn create_response_uses_camel_case() {
        let response = CreateSessionResponse {
            client_secret: "cs_1_secret".into(),
            session_id: "cs_1".into(),
        };
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["clientSecret"], "cs_1_secret");
        assert_eq!(json["sessionId"], "cs_1");
    }

    #[test]
    fn failures_do_not_carry_reasons() {
        let failure = LineItemFailure {
            remote_price_id: "price_x".into(),
            reason: "relation prices does not exist".into(),
            retryable: false,
        };
        let json = serde_json::to_value(LineItemFailureResponse::from(&failure)).unwrap();
        assert!(json.get("reason").is_none());
        assert_eq!(json["remotePriceId"], "price_x");
    }
}
