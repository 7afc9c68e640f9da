//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `WebhookEventRepository` - webhook idempotency guard and audit log
//! - `SubscriptionRepository` - local subscription rows
//! - `CatalogReader` / `CustomerDirectory` - catalog collaborators
//! - `PaymentGateway` - remote payment processor API

mod catalog;
mod payment_gateway;
mod subscription_repository;
mod webhook_event_repository;

pub use catalog::{CatalogReader, CustomerDirectory};
pub use payment_gateway::{
    CreateCheckoutSessionRequest, CreatedCheckoutSession, GatewayError, GatewayErrorCode,
    PaymentGateway,
};
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_repository::{
    ClaimResult, ProcessingOutcome, WebhookEventRecord, WebhookEventRepository,
};
