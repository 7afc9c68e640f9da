//! InvoiceReconciler - records invoice payment outcomes on subscription rows.
//!
//! Invoice events never change subscription status; the processor follows
//! them with a `customer.subscription.updated` carrying the new status.

use std::sync::Arc;

use async_trait::async_trait;

use super::dispatcher::WebhookEventHandler;
use super::mapping::{timestamp_from_remote, RowErrors};
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::{EventType, WebhookError, WebhookEvent};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentResult {
    Succeeded,
    Failed,
}

pub struct InvoiceReconciler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl InvoiceReconciler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    async fn record(&self, event: &WebhookEvent, result: PaymentResult) -> Result<(), WebhookError> {
        let invoice = event.invoice()?;
        let Some(remote_subscription_id) = invoice.subscription_id() else {
            return Err(WebhookError::Ignored(format!(
                "invoice {} is not for a subscription",
                invoice.id
            )));
        };
        // A failed attempt has no transition of its own; the event time is
        // when it happened.
        let paid_at: Timestamp = match (result, invoice.paid_at()) {
            (PaymentResult::Succeeded, Some(secs)) => {
                timestamp_from_remote("status_transitions.paid_at", secs)?
            }
            _ => event.created_at()?,
        };

        let rows = self
            .subscriptions
            .find_by_remote_subscription_id(remote_subscription_id)
            .await?;
        if rows.is_empty() {
            return Err(WebhookError::SubscriptionNotFound(
                remote_subscription_id.to_string(),
            ));
        }

        let mut errors = RowErrors::default();
        for mut row in rows {
            match result {
                PaymentResult::Succeeded => row.record_payment_succeeded(&invoice.id, paid_at),
                PaymentResult::Failed => row.record_payment_failed(&invoice.id, paid_at),
            }
            let saved = self
                .subscriptions
                .update(&row)
                .await
                .map_err(WebhookError::from);
            if saved.is_ok() {
                tracing::info!(
                    subscription_id = %row.id,
                    invoice_id = %invoice.id,
                    failed_payment_count = row.billing.failed_payment_count,
                    outcome = ?result,
                    "Invoice payment recorded"
                );
            }
            errors.record(saved);
        }
        errors.finish()
    }
}

#[async_trait]
impl WebhookEventHandler for InvoiceReconciler {
    fn name(&self) -> &'static str {
        "invoice_reconciler"
    }

    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        match event.business_type() {
            Some(EventType::InvoicePaymentSucceeded) | Some(EventType::InvoicePaid) => {
                self.record(event, PaymentResult::Succeeded).await
            }
            Some(EventType::InvoicePaymentFailed) => self.record(event, PaymentResult::Failed).await,
            _ => Err(WebhookError::Ignored(format!(
                "{} is not an invoice payment event",
                event.event_type
            ))),
        }
    }
}
