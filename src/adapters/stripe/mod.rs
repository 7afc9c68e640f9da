//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe:
//! - Embedded checkout session creation
//! - Checkout session and subscription retrieval
//!
//! Webhook signature verification lives in the domain
//! (`domain::webhook::WebhookVerifier`) because it is pure computation over
//! the raw body.
//!
//! # Configuration
//!
//! - `SUBSCRIPTION_SYNC__PAYMENT__API_KEY`: Stripe secret API key
//! - `SUBSCRIPTION_SYNC__PAYMENT__WEBHOOK_SECRET`: signing secret (whsec_...)

mod mock_payment_gateway;
mod stripe_gateway;

pub use mock_payment_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_gateway::{StripeConfig, StripeGateway, DEFAULT_API_BASE_URL};
