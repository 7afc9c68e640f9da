//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the state machine trait and error types used
//! across the billing and webhook domains.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CustomerId, PriceId, ProductId, SubscriptionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
