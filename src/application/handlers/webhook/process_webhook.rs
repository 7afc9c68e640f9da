//! ProcessWebhookHandler - verifies, deduplicates and dispatches one
//! inbound webhook delivery.
//!
//! Flow:
//! 1. Verify the signature over the raw body and decode the envelope
//! 2. Claim the event ID in the event log
//! 3. Dispatch under the retry policy, bounded by the processing budget
//! 4. Mark processed on success, release the claim on failure

use std::sync::Arc;
use std::time::Duration;

use super::dispatcher::{DispatchOutcome, HandlerRegistry};
use super::retry::RetryPolicy;
use crate::domain::webhook::{WebhookError, WebhookVerifier};
use crate::ports::{ClaimResult, WebhookEventRecord, WebhookEventRepository};

pub const DEFAULT_PROCESSING_BUDGET: Duration = Duration::from_secs(10);
pub const DEFAULT_CLAIM_LEASE_SECS: i64 = 60;

/// Raw delivery as received over HTTP.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// Acknowledged delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReceipt {
    Dispatched {
        event_id: String,
        outcome: DispatchOutcome,
    },
    /// Event ID already processed by an earlier delivery.
    Duplicate { event_id: String },
    /// Another delivery of the same event is dispatching right now.
    InFlight { event_id: String },
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessingLimits {
    pub retry: RetryPolicy,
    /// Wall-clock limit for dispatch including all retries.
    pub budget: Duration,
    /// Age after which an unfinished claim may be taken over.
    pub claim_lease: chrono::Duration,
}

impl Default for ProcessingLimits {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            budget: DEFAULT_PROCESSING_BUDGET,
            claim_lease: chrono::Duration::seconds(DEFAULT_CLAIM_LEASE_SECS),
        }
    }
}

pub struct ProcessWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    events: Arc<dyn WebhookEventRepository>,
    registry: Arc<HandlerRegistry>,
    limits: ProcessingLimits,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: Arc<WebhookVerifier>,
        events: Arc<dyn WebhookEventRepository>,
        registry: Arc<HandlerRegistry>,
        limits: ProcessingLimits,
    ) -> Self {
        Self {
            verifier,
            events,
            registry,
            limits,
        }
    }

    pub async fn handle(&self, cmd: ProcessWebhookCommand) -> Result<WebhookReceipt, WebhookError> {
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)
            .map_err(|err| {
                if err.is_authentication() {
                    tracing::warn!(security = true, error = %err, "Webhook authentication failed");
                } else {
                    tracing::warn!(error = %err, "Rejected undecodable webhook payload");
                }
                err
            })?;

        let record = WebhookEventRecord::received(
            &event.id,
            &event.event_type,
            String::from_utf8_lossy(&cmd.payload),
        );
        let claim = self.events.claim(record, self.limits.claim_lease).await?;

        match claim {
            ClaimResult::AlreadyProcessed => {
                tracing::info!(event_id = %event.id, "Duplicate webhook delivery, skipping");
                return Ok(WebhookReceipt::Duplicate { event_id: event.id });
            }
            ClaimResult::InFlight => {
                tracing::info!(event_id = %event.id, "Webhook event already in flight, skipping");
                return Ok(WebhookReceipt::InFlight { event_id: event.id });
            }
            ClaimResult::Claimed { attempt } => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    delivery = attempt,
                    "Processing webhook event"
                );
            }
        }

        let dispatch = self
            .limits
            .retry
            .run(&event.id, &event.event_type, |_| self.registry.dispatch(&event));
        let result = match tokio::time::timeout(self.limits.budget, dispatch).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    event_id = %event.id,
                    budget_ms = self.limits.budget.as_millis() as u64,
                    "Webhook processing budget exceeded"
                );
                Err(WebhookError::Timeout)
            }
        };

        match result {
            Ok(outcome) => {
                self.events
                    .mark_processed(&event.id, outcome.processing_outcome())
                    .await?;
                Ok(WebhookReceipt::Dispatched {
                    event_id: event.id,
                    outcome,
                })
            }
            Err(err) => {
                if let Err(release_err) = self.events.release(&event.id, &err.to_string()).await {
                    tracing::warn!("Failed to release webhook claim: {}", release_err);
                }
                Err(err)
            }
        }
    }
}
