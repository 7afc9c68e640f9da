//! CheckoutMaterializer - turns a completed checkout session into local
//! subscription rows.
//!
//! Runs from both the `checkout.session.completed` webhook and the
//! verify-session endpoint, whichever comes first. Either path may race the
//! other or a `customer.subscription.created` event; the unique remote item
//! key makes every path converge on one row per item.

use std::sync::Arc;

use crate::application::handlers::webhook::mapping::build_subscription;
use crate::domain::billing::{
    CheckoutLineItem, CheckoutSession, LineItemFailure, MaterializationReport, Subscription,
};
use crate::domain::foundation::{CustomerId, ErrorCode};
use crate::domain::webhook::{RemoteSubscription, WebhookError};
use crate::ports::{CatalogReader, CustomerDirectory, PaymentGateway, SubscriptionRepository};

enum ItemOutcome {
    Created(Subscription),
    Existing(Subscription),
}

pub struct CheckoutMaterializer {
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CatalogReader>,
    customers: Arc<dyn CustomerDirectory>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutMaterializer {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CatalogReader>,
        customers: Arc<dyn CustomerDirectory>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
            customers,
            gateway,
        }
    }

    /// Materializes every line item of a complete session.
    ///
    /// Line items fail individually and are reported; the call itself only
    /// fails when the session cannot be read at all. A session without a
    /// remote subscription (one-off payment) yields `Ignored`.
    pub async fn materialize(
        &self,
        session: &CheckoutSession,
    ) -> Result<MaterializationReport, WebhookError> {
        if !session.is_complete() {
            return Err(WebhookError::Ignored(format!(
                "checkout session {} is {}",
                session.remote_session_id,
                session.status.as_str()
            )));
        }
        let Some(remote_subscription_id) = session.remote_subscription_id.as_deref() else {
            return Err(WebhookError::Ignored(format!(
                "checkout session {} has no subscription",
                session.remote_session_id
            )));
        };

        let remote = self
            .gateway
            .retrieve_subscription(remote_subscription_id)
            .await?;

        let line_items = if session.line_items.is_empty() {
            line_items_from(&remote)
        } else {
            session.line_items.clone()
        };

        let mut report = MaterializationReport::default();

        let customer_id = match self.resolve_customer(session, &remote).await {
            Ok(customer_id) => customer_id,
            Err(err) => {
                tracing::error!(
                    session_id = %session.remote_session_id,
                    error = %err,
                    "Cannot resolve checkout customer"
                );
                report.failures = line_items
                    .iter()
                    .map(|line| failure(line, &err))
                    .collect();
                return Ok(report);
            }
        };

        for line in &line_items {
            match self.materialize_item(customer_id, &remote, line).await {
                Ok(ItemOutcome::Created(subscription)) => {
                    tracing::info!(
                        session_id = %session.remote_session_id,
                        subscription_id = %subscription.id,
                        remote_price_id = %line.remote_price_id,
                        "Subscription materialized from checkout"
                    );
                    report.created.push(subscription);
                }
                Ok(ItemOutcome::Existing(subscription)) => report.existing.push(subscription),
                Err(err) => {
                    if err.is_retryable() {
                        tracing::warn!(
                            session_id = %session.remote_session_id,
                            remote_price_id = %line.remote_price_id,
                            error = %err,
                            "Line item failed transiently"
                        );
                    } else {
                        tracing::error!(
                            session_id = %session.remote_session_id,
                            remote_price_id = %line.remote_price_id,
                            error = %err,
                            "Line item cannot be materialized"
                        );
                    }
                    report.failures.push(failure(line, &err));
                }
            }
        }

        Ok(report)
    }

    async fn resolve_customer(
        &self,
        session: &CheckoutSession,
        remote: &RemoteSubscription,
    ) -> Result<CustomerId, WebhookError> {
        let remote_customer_id = session
            .remote_customer_id
            .as_deref()
            .or_else(|| remote.customer_id())
            .filter(|id| !id.trim().is_empty())
            .ok_or(WebhookError::MissingField("customer"))?;

        let customer = self
            .customers
            .get_or_create_by_remote_id(remote_customer_id, session.customer_email.as_deref())
            .await?;
        Ok(customer.id)
    }

    async fn materialize_item(
        &self,
        customer_id: CustomerId,
        remote: &RemoteSubscription,
        line: &CheckoutLineItem,
    ) -> Result<ItemOutcome, WebhookError> {
        let item = remote.item_for_price(&line.remote_price_id).ok_or_else(|| {
            WebhookError::MalformedPayload(format!(
                "subscription {} has no item for price {}",
                remote.id, line.remote_price_id
            ))
        })?;

        if let Some(existing) = self
            .subscriptions
            .find_by_remote_item(&remote.id, &item.id)
            .await?
        {
            return Ok(ItemOutcome::Existing(existing));
        }

        let subscription =
            build_subscription(self.catalog.as_ref(), customer_id, remote, item).await?;

        match self.subscriptions.insert(&subscription).await {
            Ok(()) => Ok(ItemOutcome::Created(subscription)),
            Err(err) if err.code == ErrorCode::DuplicateSubscription => {
                // Lost the race to another delivery; adopt its row.
                self.subscriptions
                    .find_by_remote_item(&remote.id, &item.id)
                    .await?
                    .map(ItemOutcome::Existing)
                    .ok_or_else(|| WebhookError::Conflict(err.message))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn line_items_from(remote: &RemoteSubscription) -> Vec<CheckoutLineItem> {
    remote
        .items
        .data
        .iter()
        .map(|item| CheckoutLineItem {
            remote_price_id: item.price.id.clone(),
            quantity: item.quantity.unwrap_or(1),
        })
        .collect()
}

fn failure(line: &CheckoutLineItem, err: &WebhookError) -> LineItemFailure {
    LineItemFailure {
        remote_price_id: line.remote_price_id.clone(),
        reason: err.to_string(),
        retryable: err.is_retryable(),
    }
}
