//! Default handler registry.
//!
//! Business handlers cover the subscription, invoice and checkout events
//! that change local state. Every other type in the known catalog goes to
//! the audit handler, which logs the event and acknowledges it.

use std::sync::Arc;

use async_trait::async_trait;

use super::checkout_events::CheckoutCompletedHandler;
use super::dispatcher::{HandlerRegistry, WebhookEventHandler};
use super::invoice_events::InvoiceReconciler;
use super::subscription_events::SubscriptionReconciler;
use crate::application::handlers::checkout::CheckoutMaterializer;
use crate::domain::webhook::{EventType, WebhookError, WebhookEvent, KNOWN_EVENT_TYPES};
use crate::ports::{CatalogReader, CustomerDirectory, PaymentGateway, SubscriptionRepository};

/// Logs catalog events that carry no local state change.
pub struct AuditLogHandler;

#[async_trait]
impl WebhookEventHandler for AuditLogHandler {
    fn name(&self) -> &'static str {
        "audit_log"
    }

    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            category = event.category().as_str(),
            object = event.object_kind().unwrap_or("unknown"),
            livemode = event.livemode,
            "Webhook event received"
        );
        Err(WebhookError::Ignored(format!(
            "{} recorded for audit",
            event.event_type
        )))
    }
}

/// Collaborators the business handlers need.
#[derive(Clone)]
pub struct WebhookDependencies {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub catalog: Arc<dyn CatalogReader>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub materializer: Arc<CheckoutMaterializer>,
}

pub fn default_registry(deps: WebhookDependencies) -> HandlerRegistry {
    let subscriptions: Arc<dyn WebhookEventHandler> = Arc::new(SubscriptionReconciler::new(
        deps.subscriptions.clone(),
        deps.catalog,
        deps.customers,
    ));
    let invoices: Arc<dyn WebhookEventHandler> =
        Arc::new(InvoiceReconciler::new(deps.subscriptions));
    let checkout: Arc<dyn WebhookEventHandler> = Arc::new(CheckoutCompletedHandler::new(
        deps.materializer,
        deps.gateway,
    ));

    let mut registry = HandlerRegistry::new();
    for event_type in EventType::ALL {
        let handler = match event_type {
            EventType::SubscriptionCreated
            | EventType::SubscriptionUpdated
            | EventType::SubscriptionDeleted
            | EventType::SubscriptionPaused
            | EventType::SubscriptionResumed => subscriptions.clone(),
            EventType::InvoicePaymentSucceeded
            | EventType::InvoicePaid
            | EventType::InvoicePaymentFailed => invoices.clone(),
            EventType::CheckoutSessionCompleted => checkout.clone(),
        };
        registry.register(event_type.as_str(), handler);
    }
    registry.register_fallback(KNOWN_EVENT_TYPES.iter().copied(), Arc::new(AuditLogHandler));

    tracing::debug!(handlers = registry.len(), "Webhook handler registry built");
    registry
}
