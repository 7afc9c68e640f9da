//! Webhook handlers.
//!
//! Ingestion pipeline for payment processor events: verification and
//! idempotent dispatch, plus the business handlers that reconcile local
//! subscription state.

mod checkout_events;
mod dispatcher;
mod invoice_events;
pub(crate) mod mapping;
mod process_webhook;
mod registry;
mod retry;
mod subscription_events;

pub use checkout_events::CheckoutCompletedHandler;
pub use dispatcher::{DispatchOutcome, HandlerRegistry, WebhookEventHandler};
pub use invoice_events::InvoiceReconciler;
pub use process_webhook::{
    ProcessWebhookCommand, ProcessWebhookHandler, ProcessingLimits, WebhookReceipt,
    DEFAULT_CLAIM_LEASE_SECS, DEFAULT_PROCESSING_BUDGET,
};
pub use registry::{default_registry, AuditLogHandler, WebhookDependencies};
pub use retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use subscription_events::SubscriptionReconciler;
