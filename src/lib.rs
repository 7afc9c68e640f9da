//! Subscription Sync - webhook-driven subscription reconciliation
//!
//! Receives signed payment processor webhooks, records each event exactly
//! once, and reconciles local subscription rows with the processor's view.
//! Also exposes the embedded checkout endpoints that create subscriptions
//! when a checkout session completes.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
