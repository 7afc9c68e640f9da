//! In-memory webhook event log.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{ClaimResult, ProcessingOutcome, WebhookEventRecord, WebhookEventRepository};

/// Map-backed event log. The write lock plays the role of the primary key.
#[derive(Clone, Default)]
pub struct InMemoryWebhookEventRepository {
    records: Arc<RwLock<HashMap<String, WebhookEventRecord>>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn processed_count(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.processed)
            .count()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn claim(
        &self,
        record: WebhookEventRecord,
        lease: Duration,
    ) -> Result<ClaimResult, DomainError> {
        let mut records = self.records.write().await;
        let now = Timestamp::now();

        match records.get_mut(&record.event_id) {
            None => {
                records.insert(record.event_id.clone(), record);
                Ok(ClaimResult::Claimed { attempt: 1 })
            }
            Some(existing) if existing.processed => Ok(ClaimResult::AlreadyProcessed),
            Some(existing) if existing.claim_expired(now, lease) => {
                existing.claimed_at = Some(now);
                existing.attempts += 1;
                Ok(ClaimResult::Claimed {
                    attempt: existing.attempts,
                })
            }
            Some(_) => Ok(ClaimResult::InFlight),
        }
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        outcome: ProcessingOutcome,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(event_id).ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, format!("no webhook event {}", event_id))
        })?;
        record.processed = true;
        record.processed_at = Some(Timestamp::now());
        record.outcome = Some(outcome);
        record.claimed_at = None;
        record.last_error = None;
        Ok(())
    }

    async fn release(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(event_id) {
            if !record.processed {
                record.claimed_at = None;
                record.last_error = Some(error.to_string());
            }
        }
        Ok(())
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lease() -> Duration {
        Duration::seconds(30)
    }

    fn record(id: &str) -> WebhookEventRecord {
        WebhookEventRecord::received(id, "invoice.paid", "{}")
    }

    #[tokio::test]
    async fn first_claim_inserts_row() {
        let repo = InMemoryWebhookEventRepository::new();
        let result = repo.claim(record("evt_1"), lease()).await.unwrap();
        assert_eq!(result, ClaimResult::Claimed { attempt: 1 });
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn live_claim_is_in_flight() {
        let repo = InMemoryWebhookEventRepository::new();
        repo.claim(record("evt_1"), lease()).await.unwrap();
        let second = repo.claim(record("evt_1"), lease()).await.unwrap();
        assert_eq!(second, ClaimResult::InFlight);
    }

    #[tokio::test]
    async fn processed_row_is_never_reclaimed() {
        let repo = InMemoryWebhookEventRepository::new();
        repo.claim(record("evt_1"), lease()).await.unwrap();
        repo.mark_processed("evt_1", ProcessingOutcome::Processed)
            .await
            .unwrap();

        let again = repo.claim(record("evt_1"), Duration::zero()).await.unwrap();
        assert_eq!(again, ClaimResult::AlreadyProcessed);
        assert_eq!(repo.processed_count().await, 1);
    }

    #[tokio::test]
    async fn released_row_can_be_reclaimed() {
        let repo = InMemoryWebhookEventRepository::new();
        repo.claim(record("evt_1"), lease()).await.unwrap();
        repo.release("evt_1", "store down").await.unwrap();

        let again = repo.claim(record("evt_1"), lease()).await.unwrap();
        assert_eq!(again, ClaimResult::Claimed { attempt: 2 });

        let stored = repo.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(stored.last_error.as_deref(), Some("store down"));
        assert!(!stored.processed);
    }

    #[tokio::test]
    async fn release_does_not_unprocess() {
        let repo = InMemoryWebhookEventRepository::new();
        repo.claim(record("evt_1"), lease()).await.unwrap();
        repo.mark_processed("evt_1", ProcessingOutcome::Ignored)
            .await
            .unwrap();
        repo.release("evt_1", "late failure").await.unwrap();

        let stored = repo.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert!(stored.processed);
        assert!(stored.last_error.is_none());
    }
}
