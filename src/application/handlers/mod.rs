//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod checkout;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use checkout::{
    CheckoutError, CheckoutMaterializer, CreateCheckoutSessionCommand,
    CreateCheckoutSessionHandler, CreateCheckoutSessionResult, VerifyCheckoutSessionHandler,
    VerifyCheckoutSessionQuery, VerifyCheckoutSessionResult,
};
pub use webhook::{
    default_registry, DispatchOutcome, HandlerRegistry, ProcessWebhookCommand,
    ProcessWebhookHandler, ProcessingLimits, RetryPolicy, WebhookDependencies,
    WebhookEventHandler, WebhookReceipt,
};
