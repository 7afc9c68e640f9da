//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Pre-configured checkout sessions and subscriptions
//! - Error injection
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::webhook::{RemoteCheckoutSession, RemoteSubscription};
use crate::ports::{
    CreateCheckoutSessionRequest, CreatedCheckoutSession, GatewayError, PaymentGateway,
};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.add_subscription(remote_subscription);
/// gateway.set_method_error("retrieve_subscription", GatewayError::network("reset"));
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<String, RemoteCheckoutSession>,
    subscriptions: HashMap<String, RemoteSubscription>,

    /// Error to return on the next call to any method.
    next_error: Option<GatewayError>,

    /// Errors by method name; persist until cleared.
    method_errors: HashMap<String, GatewayError>,

    call_log: Vec<MethodCall>,
    created_sessions: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Session returned by `retrieve_checkout_session`.
    pub fn add_checkout_session(&self, session: RemoteCheckoutSession) {
        self.state().sessions.insert(session.id.clone(), session);
    }

    /// Subscription returned by `retrieve_subscription`.
    pub fn add_subscription(&self, subscription: RemoteSubscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        self.record_call(
            "create_checkout_session",
            vec![
                request.remote_price_id.clone(),
                request.remote_customer_id.clone(),
                request.quantity.to_string(),
            ],
        );
        self.check_error("create_checkout_session")?;

        let mut state = self.state();
        state.created_sessions += 1;
        let session_id = format!("cs_mock_{}", state.created_sessions);
        Ok(CreatedCheckoutSession {
            client_secret: format!("{}_secret_mock", session_id),
            session_id,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<RemoteCheckoutSession, GatewayError> {
        self.record_call("retrieve_checkout_session", vec![session_id.to_string()]);
        self.check_error("retrieve_checkout_session")?;

        self.state()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(&format!("checkout session {}", session_id)))
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<RemoteSubscription, GatewayError> {
        self.record_call("retrieve_subscription", vec![subscription_id.to_string()]);
        self.check_error("retrieve_subscription")?;

        self.state()
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(&format!("subscription {}", subscription_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorCode;

    fn request() -> CreateCheckoutSessionRequest {
        CreateCheckoutSessionRequest {
            remote_price_id: "price_1".to_string(),
            remote_customer_id: "cus_1".to_string(),
            quantity: 1,
            return_url: "https://shop.example.com/return".to_string(),
        }
    }

    #[tokio::test]
    async fn create_session_returns_unique_ids() {
        let gateway = MockPaymentGateway::new();
        let first = gateway.create_checkout_session(request()).await.unwrap();
        let second = gateway.create_checkout_session(request()).await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        assert!(first.client_secret.starts_with(&first.session_id));
        assert_eq!(gateway.call_count("create_checkout_session"), 2);
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let gateway = MockPaymentGateway::new();
        let err = gateway.retrieve_subscription("sub_missing").await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::NotFound);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn next_error_is_consumed() {
        let gateway = MockPaymentGateway::new();
        gateway.set_error(GatewayError::network("connection reset"));

        assert!(gateway.create_checkout_session(request()).await.is_err());
        assert!(gateway.create_checkout_session(request()).await.is_ok());
    }

    #[tokio::test]
    async fn method_error_persists_until_cleared() {
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("retrieve_subscription", GatewayError::network("down"));

        assert!(gateway.retrieve_subscription("sub_1").await.is_err());
        assert!(gateway.retrieve_subscription("sub_1").await.is_err());

        gateway.clear_errors();
        assert_eq!(gateway.calls().len(), 2);
    }
}
