//! SubscriptionRepository port - persistence for local subscription rows.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId};

/// Repository for subscription rows.
///
/// # Errors
///
/// - `DuplicateSubscription` - insert collided on (remote subscription, item)
/// - `ConcurrentModification` - update saw a different `version`
/// - `SubscriptionNotFound` - update target does not exist
/// - `DatabaseError` - infrastructure failure
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Persists `subscription` if the stored version still equals
    /// `subscription.version`, then bumps the stored version by one.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// All local rows for one remote subscription, one per item.
    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Vec<Subscription>, DomainError>;

    async fn find_by_remote_item(
        &self,
        remote_subscription_id: &str,
        remote_item_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;
}
