//! Webhook ingestion configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Webhook ingestion limits and retry settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Accepted clock skew for signature timestamps, in seconds
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: u64,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Total time allowed for dispatching one event, retries included
    #[serde(default = "default_processing_budget")]
    pub processing_budget_ms: u64,

    /// Handler attempts per delivery
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// First backoff delay; doubles on each retry
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// How long a claimed event blocks redelivery before it counts as abandoned
    #[serde(default = "default_claim_lease")]
    pub claim_lease_secs: i64,
}

impl WebhookConfig {
    pub fn tolerance(&self) -> Duration {
        Duration::from_secs(self.tolerance_secs)
    }

    pub fn processing_budget(&self) -> Duration {
        Duration::from_millis(self.processing_budget_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn claim_lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.claim_lease_secs)
    }

    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tolerance_secs == 0 {
            return Err(ValidationError::InvalidWebhookSetting("tolerance_secs"));
        }
        if self.max_body_bytes < 1024 {
            return Err(ValidationError::InvalidWebhookSetting("max_body_bytes"));
        }
        if self.processing_budget_ms == 0 {
            return Err(ValidationError::InvalidWebhookSetting("processing_budget_ms"));
        }
        if self.retry_max_attempts == 0 || self.retry_max_attempts > 10 {
            return Err(ValidationError::InvalidWebhookSetting("retry_max_attempts"));
        }
        // The lease must outlive a full processing attempt or a slow handler
        // could be claimed twice.
        if self.claim_lease_secs <= 0
            || (self.claim_lease_secs as u64) * 1000 <= self.processing_budget_ms
        {
            return Err(ValidationError::InvalidWebhookSetting("claim_lease_secs"));
        }
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: default_tolerance(),
            max_body_bytes: default_max_body_bytes(),
            processing_budget_ms: default_processing_budget(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
            claim_lease_secs: default_claim_lease(),
        }
    }
}

fn default_tolerance() -> u64 {
    300
}

fn default_max_body_bytes() -> usize {
    65_536
}

fn default_processing_budget() -> u64 {
    10_000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    1_000
}

fn default_claim_lease() -> i64 {
    60
}
