//! PostgreSQL adapters - Database implementations for storage ports.
//!
//! - `PostgresWebhookEventRepository` - idempotency guard and audit log
//! - `PostgresSubscriptionRepository` - subscription rows with optimistic locking
//! - `PostgresCatalog` - product/price reader and customer directory

mod catalog;
mod pool;
mod subscription_repository;
mod webhook_event_repository;

pub use catalog::PostgresCatalog;
pub use pool::{connect, run_migrations};
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
