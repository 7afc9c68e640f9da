//! HTTP adapter for checkout endpoints.
//!
//! - `POST /checkout/create-session` - start an embedded checkout
//! - `GET /checkout/verify-session?session_id=` - materialize a completed checkout

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::checkout_routes;
