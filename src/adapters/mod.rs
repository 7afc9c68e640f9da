//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum routes for webhooks, checkout and health
//! - `postgres` - sqlx-backed storage ports
//! - `memory` - in-process storage ports for development and tests
//! - `stripe` - payment gateway client and its configurable mock

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
