//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Webhook ingestion and checkout flows live here; the domain stays free of
//! I/O and logging.

pub mod handlers;

pub use handlers::{
    // Checkout
    CheckoutError, CheckoutMaterializer, CreateCheckoutSessionCommand,
    CreateCheckoutSessionHandler, CreateCheckoutSessionResult, VerifyCheckoutSessionHandler,
    VerifyCheckoutSessionQuery, VerifyCheckoutSessionResult,
    // Webhooks
    default_registry, DispatchOutcome, HandlerRegistry, ProcessWebhookCommand,
    ProcessWebhookHandler, ProcessingLimits, RetryPolicy, WebhookDependencies,
    WebhookEventHandler, WebhookReceipt,
};
