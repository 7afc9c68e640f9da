//! HTTP adapter for payment processor webhooks.
//!
//! - `POST /api/webhooks/:provider` - verify, record and dispatch one event

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::WebhookAck;
pub use handlers::{receive_webhook, signature_header_name};
pub use routes::webhook_routes;
