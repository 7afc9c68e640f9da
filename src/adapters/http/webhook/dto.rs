//! Webhook response bodies.

use serde::Serialize;

/// Body returned for every acknowledged delivery, duplicates included.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}
