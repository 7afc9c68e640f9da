//! In-memory subscription store with the same uniqueness and version
//! semantics as the Postgres adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::ports::SubscriptionRepository;

#[derive(Clone, Default)]
pub struct InMemorySubscriptionRepository {
    rows: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    failures_remaining: Arc<AtomicU32>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls fail with a database error.
    pub fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<Subscription> {
        self.rows.read().await.values().cloned().collect()
    }

    fn injected_failure(&self) -> Result<(), DomainError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(DomainError::database("injected failure"));
        }
        Ok(())
    }
}

fn same_remote_item(a: &Subscription, b: &Subscription) -> bool {
    a.remote_subscription_id.is_some()
        && a.remote_subscription_id == b.remote_subscription_id
        && a.remote_item_id == b.remote_item_id
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.injected_failure()?;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&subscription.id)
            || rows.values().any(|row| same_remote_item(row, subscription))
        {
            return Err(DomainError::new(
                ErrorCode::DuplicateSubscription,
                format!(
                    "subscription for {:?}/{:?} already exists",
                    subscription.remote_subscription_id, subscription.remote_item_id
                ),
            ));
        }
        rows.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.injected_failure()?;
        let mut rows = self.rows.write().await;
        let stored = rows.get_mut(&subscription.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} not found", subscription.id),
            )
        })?;
        if stored.version != subscription.version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "subscription {} changed: expected version {}, found {}",
                    subscription.id, subscription.version, stored.version
                ),
            ));
        }
        *stored = subscription.clone();
        stored.version += 1;
        Ok(())
    }

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        self.injected_failure()?;
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.injected_failure()?;
        let rows = self.rows.read().await;
        let mut found: Vec<Subscription> = rows
            .values()
            .filter(|row| row.remote_subscription_id.as_deref() == Some(remote_subscription_id))
            .cloned()
            .collect();
        found.sort_by_key(|row| row.created_at);
        Ok(found)
    }

    async fn find_by_remote_item(
        &self,
        remote_subscription_id: &str,
        remote_item_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        self.injected_failure()?;
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|row| {
                row.remote_subscription_id.as_deref() == Some(remote_subscription_id)
                    && row.remote_item_id.as_deref() == Some(remote_item_id)
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::test_support::subscription_with_status;
    use crate::domain::billing::SubscriptionStatus;

    #[tokio::test]
    async fn insert_rejects_duplicate_remote_item() {
        let repo = InMemorySubscriptionRepository::new();
        let first = subscription_with_status(SubscriptionStatus::Active);
        let mut second = subscription_with_status(SubscriptionStatus::Active);
        second.remote_item_id = first.remote_item_id.clone();

        repo.insert(&first).await.unwrap();
        let err = repo.insert(&second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateSubscription);
    }

    #[tokio::test]
    async fn update_bumps_version_and_rejects_stale_writes() {
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription_with_status(SubscriptionStatus::Active);
        repo.insert(&sub).await.unwrap();

        let mut first = repo.find_by_id(sub.id).await.unwrap().unwrap();
        let mut stale = first.clone();

        first.set_quantity(3);
        repo.update(&first).await.unwrap();

        stale.set_quantity(5);
        let err = repo.update(&stale).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);

        let stored = repo.find_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 3);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription_with_status(SubscriptionStatus::Active);
        let err = repo.update(&sub).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let repo = InMemorySubscriptionRepository::new();
        repo.fail_next(1);
        assert!(repo.find_by_remote_subscription_id("sub_x").await.is_err());
        assert!(repo.find_by_remote_subscription_id("sub_x").await.is_ok());
    }
}
