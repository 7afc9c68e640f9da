//! Event dispatch - maps event type strings to handlers.
//!
//! The registry is filled once at startup and read-only afterwards. Each
//! handler runs in its own task so a panic is contained and reported as
//! [`WebhookError::HandlerPanicked`] instead of tearing down the request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::domain::webhook::{WebhookError, WebhookEvent};
use crate::ports::ProcessingOutcome;

/// Handles one or more webhook event types.
///
/// `Err(WebhookError::Ignored)` and `Err(WebhookError::InvalidTransition)`
/// are acknowledged by the dispatcher; every other error propagates to the
/// retry policy.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError>;
}

/// What dispatch did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Ignored(String),
    TransitionRejected(String),
    /// No handler registered for the type.
    Unhandled,
}

impl DispatchOutcome {
    pub fn processing_outcome(&self) -> ProcessingOutcome {
        match self {
            DispatchOutcome::Handled => ProcessingOutcome::Processed,
            DispatchOutcome::Ignored(_) | DispatchOutcome::Unhandled => ProcessingOutcome::Ignored,
            DispatchOutcome::TransitionRejected(_) => ProcessingOutcome::TransitionRejected,
        }
    }
}

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn WebhookEventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event_type`, replacing any previous one.
    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        handler: Arc<dyn WebhookEventHandler>,
    ) -> &mut Self {
        self.handlers.insert(event_type.into(), handler);
        self
    }

    /// Registers `handler` for every type in `event_types` not yet taken.
    pub fn register_fallback<'a>(
        &mut self,
        event_types: impl IntoIterator<Item = &'a str>,
        handler: Arc<dyn WebhookEventHandler>,
    ) -> &mut Self {
        for event_type in event_types {
            self.handlers
                .entry(event_type.to_string())
                .or_insert_with(|| handler.clone());
        }
        self
    }

    pub fn handler_for(&self, event_type: &str) -> Option<&Arc<dyn WebhookEventHandler>> {
        self.handlers.get(event_type)
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for the event's type.
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchOutcome, WebhookError> {
        let Some(handler) = self.handlers.get(&event.event_type) else {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "No handler registered, acknowledging"
            );
            return Ok(DispatchOutcome::Unhandled);
        };

        let name = handler.name();
        match run_isolated(handler.clone(), event.clone()).await {
            Ok(()) => Ok(DispatchOutcome::Handled),
            Err(WebhookError::Ignored(reason)) => {
                tracing::debug!(
                    event_id = %event.id,
                    handler = name,
                    reason = %reason,
                    "Event acknowledged without changes"
                );
                Ok(DispatchOutcome::Ignored(reason))
            }
            Err(WebhookError::InvalidTransition(reason)) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    handler = name,
                    reason = %reason,
                    "State transition rejected, acknowledging"
                );
                Ok(DispatchOutcome::TransitionRejected(reason))
            }
            Err(err) => Err(err),
        }
    }
}

/// Aborts the task if the dispatch future is dropped, e.g. on timeout.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_isolated(
    handler: Arc<dyn WebhookEventHandler>,
    event: WebhookEvent,
) -> Result<(), WebhookError> {
    let name = handler.name();
    let mut task = AbortOnDrop(tokio::spawn(async move { handler.handle(&event).await }));

    match (&mut task.0).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            tracing::error!(handler = name, "Webhook handler panicked");
            Err(WebhookError::HandlerPanicked(name.to_string()))
        }
        Err(join_err) => Err(WebhookError::Store(format!(
            "handler {} did not complete: {}",
            name, join_err
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::WebhookEventBuilder;

    struct FixedHandler(Result<(), WebhookError>);

    #[async_trait]
    impl WebhookEventHandler for FixedHandler {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn handle(&self, _event: &WebhookEvent) -> Result<(), WebhookError> {
            self.0.clone()
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl WebhookEventHandler for PanickingHandler {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn handle(&self, _event: &WebhookEvent) -> Result<(), WebhookError> {
            panic!("boom");
        }
    }

    fn registry_with(event_type: &str, handler: Arc<dyn WebhookEventHandler>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(event_type, handler);
        registry
    }

    #[tokio::test]
    async fn unknown_type_is_unhandled() {
        let registry = HandlerRegistry::new();
        let event = WebhookEventBuilder::new("mystery.event").build();

        let outcome = registry.dispatch(&event).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(outcome.processing_outcome(), ProcessingOutcome::Ignored);
    }

    #[tokio::test]
    async fn successful_handler_is_handled() {
        let registry = registry_with("invoice.paid", Arc::new(FixedHandler(Ok(()))));
        let event = WebhookEventBuilder::new("invoice.paid").build();

        let outcome = registry.dispatch(&event).await.unwrap();
        assert_eq!(outcome.processing_outcome(), ProcessingOutcome::Processed);
    }

    #[tokio::test]
    async fn invalid_transition_is_acknowledged() {
        let registry = registry_with(
            "customer.subscription.resumed",
            Arc::new(FixedHandler(Err(WebhookError::InvalidTransition(
                "canceled".into(),
            )))),
        );
        let event = WebhookEventBuilder::new("customer.subscription.resumed").build();

        let outcome = registry.dispatch(&event).await.unwrap();
        assert_eq!(
            outcome.processing_outcome(),
            ProcessingOutcome::TransitionRejected
        );
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let registry = registry_with(
            "invoice.paid",
            Arc::new(FixedHandler(Err(WebhookError::Store("down".into())))),
        );
        let event = WebhookEventBuilder::new("invoice.paid").build();

        assert_eq!(
            registry.dispatch(&event).await,
            Err(WebhookError::Store("down".into()))
        );
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let registry = registry_with("invoice.paid", Arc::new(PanickingHandler));
        let event = WebhookEventBuilder::new("invoice.paid").build();

        assert_eq!(
            registry.dispatch(&event).await,
            Err(WebhookError::HandlerPanicked("panicking".into()))
        );
    }

    #[test]
    fn fallback_does_not_replace_specific_handlers() {
        let specific: Arc<dyn WebhookEventHandler> = Arc::new(FixedHandler(Ok(())));
        let fallback: Arc<dyn WebhookEventHandler> = Arc::new(PanickingHandler);

        let mut registry = HandlerRegistry::new();
        registry
            .register("invoice.paid", specific)
            .register_fallback(["invoice.paid", "charge.refunded"], fallback);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.handler_for("invoice.paid").unwrap().name(), "fixed");
        assert_eq!(
            registry.handler_for("charge.refunded").unwrap().name(),
            "panicking"
        );
    }
}
