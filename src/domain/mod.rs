//! Domain layer - billing state and webhook semantics, free of I/O.

pub mod billing;
pub mod foundation;
pub mod webhook;
