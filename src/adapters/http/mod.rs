//! HTTP adapters - REST API implementations.
//!
//! - `POST /api/webhooks/:provider` - signed payment processor events
//! - `POST /checkout/create-session` - start an embedded checkout
//! - `GET /checkout/verify-session` - materialize a returned checkout
//! - `GET /health` - liveness probe

pub mod checkout;
pub mod error;
pub mod health;
pub mod router;
pub mod state;
pub mod webhook;

pub use error::ErrorResponse;
pub use router::{app_router, HttpLimits};
pub use state::AppState;
