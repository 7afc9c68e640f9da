//! Checkout handlers.
//!
//! ## Commands
//! - Creating embedded checkout sessions
//!
//! ## Queries
//! - Verifying a returned session (materializes it as a side effect)

mod create_checkout_session;
mod errors;
mod materializer;
mod verify_checkout_session;

pub use create_checkout_session::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, CreateCheckoutSessionResult,
};
pub use errors::CheckoutError;
pub use materializer::CheckoutMaterializer;
pub use verify_checkout_session::{
    VerifyCheckoutSessionHandler, VerifyCheckoutSessionQuery, VerifyCheckoutSessionResult,
};
