//! WebhookEventRepository port - idempotency guard and audit log for
//! inbound webhook events.
//!
//! Exactly one row exists per remote event ID. A row is inserted with
//! `processed = false` and a claim before dispatch, and flipped to
//! `processed = true` only after its handler succeeded. A crash mid-dispatch
//! leaves the claim to expire so a redelivery can take over.
//!
//! Rows are never deleted.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::foundation::{DomainError, Timestamp};

/// How a processed event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Handler ran and applied its changes.
    Processed,
    /// No handler, or the handler had nothing to do.
    Ignored,
    /// Handler refused a state transition; logged and acknowledged.
    TransitionRejected,
}

impl ProcessingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingOutcome::Processed => "processed",
            ProcessingOutcome::Ignored => "ignored",
            ProcessingOutcome::TransitionRejected => "transition_rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(ProcessingOutcome::Processed),
            "ignored" => Some(ProcessingOutcome::Ignored),
            "transition_rejected" => Some(ProcessingOutcome::TransitionRejected),
            _ => None,
        }
    }
}

/// One row of the webhook event log.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    /// Remote event ID (`evt_...`).
    pub event_id: String,
    pub event_type: String,
    /// Raw request body as received.
    pub payload: String,
    pub received_at: Timestamp,
    /// Monotonic: false → true, never back.
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    pub outcome: Option<ProcessingOutcome>,
    /// Set while a delivery is dispatching this event.
    pub claimed_at: Option<Timestamp>,
    /// Number of deliveries that claimed this event.
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl WebhookEventRecord {
    /// New, unprocessed, claimed row for an event that just arrived.
    pub fn received(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            payload: payload.into(),
            received_at: now,
            processed: false,
            processed_at: None,
            outcome: None,
            claimed_at: Some(now),
            attempts: 1,
            last_error: None,
        }
    }

    /// True if an unprocessed row may be taken over by a new delivery.
    pub fn claim_expired(&self, now: Timestamp, lease: Duration) -> bool {
        match self.claimed_at {
            None => true,
            Some(claimed_at) => now.duration_since(&claimed_at) >= lease,
        }
    }
}

/// Result of trying to claim an event for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// This delivery owns the event and must dispatch it.
    Claimed { attempt: u32 },
    /// Already processed; skip dispatch and acknowledge.
    AlreadyProcessed,
    /// Another delivery holds a live claim; skip dispatch and acknowledge.
    InFlight,
}

/// Port for the webhook event log.
///
/// Implementations rely on the primary key of the event ID, never on
/// in-process state, so concurrent deliveries of one event are safe.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Inserts `record` or re-claims an unprocessed row whose claim is
    /// older than `lease` (or was released).
    async fn claim(
        &self,
        record: WebhookEventRecord,
        lease: Duration,
    ) -> Result<ClaimResult, DomainError>;

    /// Flips `processed` to true and clears the claim.
    async fn mark_processed(
        &self,
        event_id: &str,
        outcome: ProcessingOutcome,
    ) -> Result<(), DomainError>;

    /// Drops the claim after a failed dispatch so a redelivery can retry.
    async fn release(&self, event_id: &str, error: &str) -> Result<(), DomainError>;

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;
}
