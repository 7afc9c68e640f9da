//! Webhook error taxonomy.
//!
//! Every failure in the ingestion pipeline is one of these variants. The
//! classification methods decide whether the retry middleware tries again,
//! whether the failure is logged as security relevant, and which status
//! code the sender sees.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    // Authentication
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    // Permanent payload problems
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    // Configuration mismatches (permanent)
    #[error("No local price mapped to remote price {0}")]
    PriceNotMapped(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Local row missing; usually an `updated` arriving before its `created`.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Optimistic lock lost or unique key raced.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Payment gateway error: {message}")]
    Gateway { message: String, retryable: bool },

    /// Ordering artifact such as resuming a canceled subscription.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Acknowledged without any state change.
    #[error("Event ignored: {0}")]
    Ignored(String),

    #[error("Processing budget exceeded")]
    Timeout,

    /// A handler panicked. Not retried in-process; the sender redelivers.
    #[error("Handler {0} panicked")]
    HandlerPanicked(String),
}

impl WebhookError {
    /// Transient failures that may succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::SubscriptionNotFound(_)
            | WebhookError::Conflict(_)
            | WebhookError::Store(_)
            | WebhookError::Timeout => true,
            WebhookError::Gateway { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Signature and freshness failures; logged as security relevant.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
                | WebhookError::MalformedHeader(_)
        )
    }

    /// Outcomes the dispatcher acknowledges as success.
    pub fn is_swallowed(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidTransition(_) | WebhookError::Ignored(_)
        )
    }

    /// Status code returned to the sender.
    ///
    /// 2xx stops redelivery, 4xx marks the event as rejected, 5xx asks the
    /// sender to redeliver later.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::MalformedHeader(_)
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingField(_)
            | WebhookError::PriceNotMapped(_)
            | WebhookError::ProductNotFound(_)
            | WebhookError::CustomerNotFound(_) => StatusCode::BAD_REQUEST,

            WebhookError::InvalidTransition(_) | WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::Timeout => StatusCode::SERVICE_UNAVAILABLE,

            WebhookError::Gateway { retryable: false, .. } => StatusCode::BAD_REQUEST,

            WebhookError::SubscriptionNotFound(_)
            | WebhookError::Conflict(_)
            | WebhookError::Store(_)
            | WebhookError::HandlerPanicked(_)
            | WebhookError::Gateway { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code for response bodies. Carries no event detail.
    pub fn code(&self) -> &'static str {
        if self.is_authentication() {
            return "INVALID_SIGNATURE";
        }
        match self {
            WebhookError::MalformedPayload(_) | WebhookError::MissingField(_) => {
                "MALFORMED_PAYLOAD"
            }
            WebhookError::PriceNotMapped(_)
            | WebhookError::ProductNotFound(_)
            | WebhookError::CustomerNotFound(_) => "UNPROCESSABLE_EVENT",
            WebhookError::Timeout => "TIMEOUT",
            WebhookError::InvalidTransition(_) | WebhookError::Ignored(_) => "ACCEPTED",
            WebhookError::Gateway { retryable: false, .. } => "UNPROCESSABLE_EVENT",
            _ => "PROCESSING_FAILED",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::SubscriptionNotFound => WebhookError::SubscriptionNotFound(err.message),
            ErrorCode::PriceNotFound => WebhookError::PriceNotMapped(err.message),
            ErrorCode::ProductNotFound => WebhookError::ProductNotFound(err.message),
            ErrorCode::CustomerNotFound => WebhookError::CustomerNotFound(err.message),
            ErrorCode::InvalidStateTransition => WebhookError::InvalidTransition(err.message),
            ErrorCode::ConcurrentModification | ErrorCode::DuplicateSubscription => {
                WebhookError::Conflict(err.message)
            }
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => {
                WebhookError::MalformedPayload(err.message)
            }
            ErrorCode::PaymentGatewayError => WebhookError::Gateway {
                message: err.message,
                retryable: true,
            },
            ErrorCode::DatabaseError | ErrorCode::InternalError => WebhookError::Store(err.message),
        }
    }
}
