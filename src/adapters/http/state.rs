//! Shared router state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::{
    CreateCheckoutSessionHandler, ProcessWebhookHandler, VerifyCheckoutSessionHandler,
};

/// Application handlers shared by all routes.
///
/// Cloned per request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    webhooks: Arc<HashMap<String, Arc<ProcessWebhookHandler>>>,
    pub create_checkout: Arc<CreateCheckoutSessionHandler>,
    pub verify_checkout: Arc<VerifyCheckoutSessionHandler>,
}

impl AppState {
    pub fn new(
        create_checkout: Arc<CreateCheckoutSessionHandler>,
        verify_checkout: Arc<VerifyCheckoutSessionHandler>,
    ) -> Self {
        Self {
            webhooks: Arc::new(HashMap::new()),
            create_checkout,
            verify_checkout,
        }
    }

    /// Register the ingestion pipeline for one provider name.
    pub fn with_webhook_provider(
        mut self,
        provider: impl Into<String>,
        handler: Arc<ProcessWebhookHandler>,
    ) -> Self {
        Arc::make_mut(&mut self.webhooks).insert(provider.into().to_ascii_lowercase(), handler);
        self
    }

    pub fn webhook_handler(&self, provider: &str) -> Option<Arc<ProcessWebhookHandler>> {
        self.webhooks.get(&provider.to_ascii_lowercase()).cloned()
    }
}
