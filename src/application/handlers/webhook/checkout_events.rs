//! CheckoutCompletedHandler - materializes subscriptions when a checkout
//! session completes.

use std::sync::Arc;

use async_trait::async_trait;

use super::dispatcher::WebhookEventHandler;
use crate::application::handlers::checkout::CheckoutMaterializer;
use crate::domain::webhook::{WebhookError, WebhookEvent};
use crate::ports::PaymentGateway;

pub struct CheckoutCompletedHandler {
    materializer: Arc<CheckoutMaterializer>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutCompletedHandler {
    pub fn new(materializer: Arc<CheckoutMaterializer>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            materializer,
            gateway,
        }
    }
}

#[async_trait]
impl WebhookEventHandler for CheckoutCompletedHandler {
    fn name(&self) -> &'static str {
        "checkout_completed"
    }

    /// Permanent line item failures are logged and acknowledged. Any
    /// retryable failure fails the event so already-created rows are found
    /// as existing on the next attempt.
    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        let payload = event.checkout_session()?;

        // Webhook payloads omit line items; fetch the expanded session.
        let session = if payload.has_line_items() {
            payload.to_domain()
        } else {
            self.gateway
                .retrieve_checkout_session(&payload.id)
                .await?
                .to_domain()
        };

        let report = self.materializer.materialize(&session).await?;

        if let Some(failure) = report.failures.iter().find(|f| f.retryable) {
            return Err(WebhookError::Store(format!(
                "line item {} of {}: {}",
                failure.remote_price_id, session.remote_session_id, failure.reason
            )));
        }
        if !report.failures.is_empty() {
            tracing::error!(
                session_id = %session.remote_session_id,
                failed = report.failures.len(),
                created = report.created.len(),
                "Checkout completed with unmaterialized line items"
            );
        }

        tracing::info!(
            session_id = %session.remote_session_id,
            created = report.created.len(),
            existing = report.existing.len(),
            "Checkout session materialized"
        );
        Ok(())
    }
}
