//! In-memory adapters for every storage port.
//!
//! Used by tests and by the server when no database is configured.

mod catalog;
mod subscription_repository;
mod webhook_event_repository;

pub use catalog::InMemoryCatalog;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
