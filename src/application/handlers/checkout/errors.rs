//! Checkout endpoint errors.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | PriceNotFound / CustomerNotFound | 404 |
//! | CustomerNotBillable / PriceNotRecurring | 422 |
//! | InvalidQuantity / InvalidReturnUrl | 400 |
//! | SessionNotComplete | 409 |
//! | Gateway | 404 if the remote object is unknown, else 502 |
//! | Materialization / Store | 500 (503 for timeouts) |

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{CustomerId, DomainError, PriceId};
use crate::domain::webhook::WebhookError;
use crate::ports::{GatewayError, GatewayErrorCode};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckoutError {
    #[error("Price not found: {0}")]
    PriceNotFound(PriceId),

    #[error("Price {0} is not recurring")]
    PriceNotRecurring(PriceId),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// Customer exists locally but was never linked to the processor.
    #[error("Customer {0} has no payment processor ID")]
    CustomerNotBillable(CustomerId),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Invalid return URL: {0}")]
    InvalidReturnUrl(String),

    #[error("Checkout session {0} is not complete")]
    SessionNotComplete(String),

    #[error("Payment gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Materialization failed: {0}")]
    Materialization(WebhookError),

    #[error("Store error: {0}")]
    Store(String),
}

impl CheckoutError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::PriceNotFound(_) | CheckoutError::CustomerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CheckoutError::PriceNotRecurring(_) | CheckoutError::CustomerNotBillable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CheckoutError::InvalidQuantity | CheckoutError::InvalidReturnUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::SessionNotComplete(_) => StatusCode::CONFLICT,
            CheckoutError::Gateway(err) if err.code == GatewayErrorCode::NotFound => {
                StatusCode::NOT_FOUND
            }
            CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::Materialization(WebhookError::Timeout) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CheckoutError::Materialization(_) | CheckoutError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::PriceNotFound(_) => "PRICE_NOT_FOUND",
            CheckoutError::PriceNotRecurring(_) => "PRICE_NOT_RECURRING",
            CheckoutError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            CheckoutError::CustomerNotBillable(_) => "CUSTOMER_NOT_BILLABLE",
            CheckoutError::InvalidQuantity => "INVALID_QUANTITY",
            CheckoutError::InvalidReturnUrl(_) => "INVALID_RETURN_URL",
            CheckoutError::SessionNotComplete(_) => "SESSION_NOT_COMPLETE",
            CheckoutError::Gateway(err) if err.code == GatewayErrorCode::NotFound => {
                "SESSION_NOT_FOUND"
            }
            CheckoutError::Gateway(_) => "PAYMENT_GATEWAY_ERROR",
            CheckoutError::Materialization(WebhookError::Timeout) => "TIMEOUT",
            CheckoutError::Materialization(_) => "MATERIALIZATION_FAILED",
            CheckoutError::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Server-side failures; their messages stay out of responses.
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        CheckoutError::Gateway(err)
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        CheckoutError::Store(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            CheckoutError::PriceNotFound(PriceId::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CheckoutError::CustomerNotBillable(CustomerId::new()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            CheckoutError::InvalidQuantity.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CheckoutError::SessionNotComplete("cs_1".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn gateway_not_found_is_404_other_gateway_errors_are_502() {
        let missing = CheckoutError::from(GatewayError::not_found("checkout session"));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.code(), "SESSION_NOT_FOUND");

        let down = CheckoutError::from(GatewayError::network("connection reset"));
        assert_eq!(down.status_code(), StatusCode::BAD_GATEWAY);
        assert!(down.is_internal());
    }

    #[test]
    fn materialization_timeout_is_503() {
        let err = CheckoutError::Materialization(WebhookError::Timeout);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "TIMEOUT");
    }
}
