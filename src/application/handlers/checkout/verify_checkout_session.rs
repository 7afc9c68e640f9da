//! VerifyCheckoutSessionHandler - confirms a checkout on return from the
//! embedded form and materializes it without waiting for the webhook.

use std::sync::Arc;

use super::errors::CheckoutError;
use super::materializer::CheckoutMaterializer;
use crate::domain::billing::{CheckoutStatus, MaterializationReport};
use crate::domain::webhook::WebhookError;
use crate::ports::PaymentGateway;

#[derive(Debug, Clone)]
pub struct VerifyCheckoutSessionQuery {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCheckoutSessionResult {
    pub session_id: String,
    pub status: CheckoutStatus,
    pub report: MaterializationReport,
}

pub struct VerifyCheckoutSessionHandler {
    gateway: Arc<dyn PaymentGateway>,
    materializer: Arc<CheckoutMaterializer>,
}

impl VerifyCheckoutSessionHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, materializer: Arc<CheckoutMaterializer>) -> Self {
        Self {
            gateway,
            materializer,
        }
    }

    pub async fn handle(
        &self,
        query: VerifyCheckoutSessionQuery,
    ) -> Result<VerifyCheckoutSessionResult, CheckoutError> {
        let session = self
            .gateway
            .retrieve_checkout_session(&query.session_id)
            .await?
            .to_domain();

        if !session.is_complete() {
            return Err(CheckoutError::SessionNotComplete(session.remote_session_id));
        }

        let report = match self.materializer.materialize(&session).await {
            Ok(report) => report,
            Err(WebhookError::Ignored(reason)) => {
                tracing::info!(session_id = %session.remote_session_id, reason = %reason, "Nothing to materialize");
                MaterializationReport::default()
            }
            Err(err) => return Err(CheckoutError::Materialization(err)),
        };

        Ok(VerifyCheckoutSessionResult {
            session_id: session.remote_session_id,
            status: session.status,
            report,
        })
    }
}
