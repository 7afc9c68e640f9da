//! SubscriptionReconciler - applies `customer.subscription.*` events to
//! local subscription rows.
//!
//! Each remote item maps to one local row. Updates re-read the row on every
//! attempt, so a lost optimistic lock is resolved by the retry policy.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::dispatcher::WebhookEventHandler;
use super::mapping::{
    build_subscription, delivery_for, period_from_remote, status_from_remote,
    timestamp_from_remote, RowErrors,
};
use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::{
    EventType, RemoteSubscription, RemoteSubscriptionItem, WebhookError, WebhookEvent,
};
use crate::ports::{CatalogReader, CustomerDirectory, SubscriptionRepository};

pub struct SubscriptionReconciler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CatalogReader>,
    customers: Arc<dyn CustomerDirectory>,
}

impl SubscriptionReconciler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CatalogReader>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
            customers,
        }
    }

    /// Upserts one row per remote item.
    pub async fn on_created(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        let remote = event.subscription()?;
        if remote.items.data.is_empty() {
            return Err(WebhookError::Ignored(format!(
                "subscription {} has no items",
                remote.id
            )));
        }
        let event_at = event.created_at()?;

        let mut errors = RowErrors::default();
        for item in &remote.items.data {
            let result = match self
                .subscriptions
                .find_by_remote_item(&remote.id, &item.id)
                .await?
            {
                Some(existing) => self.apply_remote(existing, &remote, Some(item), event_at).await,
                None => self.create_row(&remote, item).await,
            };
            errors.record(result);
        }
        errors.finish()
    }

    /// Mirrors status, quantity, period and cancellation flags.
    ///
    /// Fails with `SubscriptionNotFound` when no row exists yet, which the
    /// retry policy treats as an out-of-order delivery.
    pub async fn on_updated(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        let remote = event.subscription()?;
        let event_at = event.created_at()?;
        let rows = self.rows_for(&remote.id).await?;

        let known: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.remote_item_id.clone())
            .collect();

        let mut errors = RowErrors::default();
        for row in rows {
            let item = row
                .remote_item_id
                .as_deref()
                .and_then(|item_id| remote.item(item_id));
            let result = self.apply_remote(row, &remote, item, event_at).await;
            errors.record(result);
        }

        // Items added to the remote subscription after it was created.
        if status_from_remote(&remote.status)? != SubscriptionStatus::Canceled {
            for item in remote.items.data.iter().filter(|i| !known.contains(&i.id)) {
                tracing::info!(
                    remote_subscription_id = %remote.id,
                    remote_item_id = %item.id,
                    "New item on existing subscription"
                );
                errors.record(self.create_row(&remote, item).await);
            }
        }

        errors.finish()
    }

    /// Cancels every row of the remote subscription. Repeats are no-ops.
    pub async fn on_deleted(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        let remote = event.subscription()?;
        let canceled_at = match remote.canceled_at {
            Some(secs) => timestamp_from_remote("canceled_at", secs)?,
            None => event.created_at()?,
        };

        let mut errors = RowErrors::default();
        for mut row in self.rows_for(&remote.id).await? {
            match row.cancel(canceled_at) {
                Ok(false) => {
                    tracing::debug!(subscription_id = %row.id, "Subscription already canceled");
                    errors.applied();
                }
                Ok(true) => {
                    let result = self.save(&row).await;
                    if result.is_ok() {
                        tracing::info!(
                            subscription_id = %row.id,
                            remote_subscription_id = %remote.id,
                            "Subscription canceled"
                        );
                    }
                    errors.record(result);
                }
                Err(err) => errors.push(err.into()),
            }
        }
        errors.finish()
    }

    pub async fn on_paused(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        self.move_all_to(event, SubscriptionStatus::Paused).await
    }

    pub async fn on_resumed(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        self.move_all_to(event, SubscriptionStatus::Active).await
    }

    async fn move_all_to(
        &self,
        event: &WebhookEvent,
        target: SubscriptionStatus,
    ) -> Result<(), WebhookError> {
        let remote = event.subscription()?;

        let mut errors = RowErrors::default();
        for mut row in self.rows_for(&remote.id).await? {
            match row.change_status(target) {
                Ok(false) => errors.applied(),
                Ok(true) => errors.record(self.save(&row).await),
                Err(err) => errors.push(err.into()),
            }
        }
        errors.finish()
    }

    async fn rows_for(&self, remote_subscription_id: &str) -> Result<Vec<Subscription>, WebhookError> {
        let rows = self
            .subscriptions
            .find_by_remote_subscription_id(remote_subscription_id)
            .await?;
        if rows.is_empty() {
            return Err(WebhookError::SubscriptionNotFound(
                remote_subscription_id.to_string(),
            ));
        }
        Ok(rows)
    }

    async fn create_row(
        &self,
        remote: &RemoteSubscription,
        item: &RemoteSubscriptionItem,
    ) -> Result<(), WebhookError> {
        let remote_customer_id = remote
            .customer_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or(WebhookError::MissingField("customer"))?;
        let customer = self
            .customers
            .get_or_create_by_remote_id(remote_customer_id, None)
            .await?;

        let subscription =
            build_subscription(self.catalog.as_ref(), customer.id, remote, item).await?;
        self.subscriptions.insert(&subscription).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            remote_subscription_id = %remote.id,
            remote_item_id = %item.id,
            status = %subscription.status,
            "Subscription created from webhook"
        );
        Ok(())
    }

    /// Copies remote state onto an existing row and persists it.
    ///
    /// An invalid status transition keeps the stored status; the other
    /// fields are still applied.
    async fn apply_remote(
        &self,
        mut row: Subscription,
        remote: &RemoteSubscription,
        item: Option<&RemoteSubscriptionItem>,
        event_at: Timestamp,
    ) -> Result<(), WebhookError> {
        if row.is_canceled() {
            return Err(WebhookError::InvalidTransition(format!(
                "subscription {} is canceled",
                row.id
            )));
        }

        let target = status_from_remote(&remote.status)?;
        let (start, end) = match item {
            Some(item) => remote.period_for(item),
            None => (remote.current_period_start, remote.current_period_end),
        };

        if let Some(period) = period_from_remote(start, end)? {
            if period != row.period {
                row.set_period(period);
            }
        }
        if let Some(quantity) = item.and_then(|i| i.quantity) {
            if quantity != row.quantity {
                row.set_quantity(quantity);
            }
        }
        if remote.cancel_at_period_end != row.cancel_at_period_end {
            row.set_cancel_at_period_end(remote.cancel_at_period_end);
        }

        if target == SubscriptionStatus::Canceled {
            let canceled_at = match remote.canceled_at {
                Some(secs) => timestamp_from_remote("canceled_at", secs)?,
                None => event_at,
            };
            row.cancel(canceled_at)?;
        } else if let Err(err) = row.change_status(target) {
            tracing::warn!(
                subscription_id = %row.id,
                from = %row.status,
                to = %target,
                error = %err,
                "Rejected status transition, keeping stored status"
            );
        }

        let local_recurrence = self
            .catalog
            .get_price_by_id(row.price_id)
            .await?
            .and_then(|price| price.recurrence);
        let recurrence = local_recurrence.or_else(|| item.and_then(|i| i.price.recurrence()));
        let next_delivery = delivery_for(&remote.id, row.period.start(), recurrence)?;
        if next_delivery != row.next_delivery_date {
            row.reschedule_delivery(next_delivery);
        }

        self.save(&row).await
    }

    async fn save(&self, row: &Subscription) -> Result<(), WebhookError> {
        self.subscriptions.update(row).await.map_err(WebhookError::from)
    }
}

#[async_trait]
impl WebhookEventHandler for SubscriptionReconciler {
    fn name(&self) -> &'static str {
        "subscription_reconciler"
    }

    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        match event.business_type() {
            Some(EventType::SubscriptionCreated) => self.on_created(event).await,
            Some(EventType::SubscriptionUpdated) => self.on_updated(event).await,
            Some(EventType::SubscriptionDeleted) => self.on_deleted(event).await,
            Some(EventType::SubscriptionPaused) => self.on_paused(event).await,
            Some(EventType::SubscriptionResumed) => self.on_resumed(event).await,
            _ => Err(WebhookError::Ignored(format!(
                "{} is not a subscription event",
                event.event_type
            ))),
        }
    }
}
