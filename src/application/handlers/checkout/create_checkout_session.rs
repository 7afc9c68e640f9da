//! CreateCheckoutSessionHandler - starts an embedded checkout for one price.

use std::sync::Arc;

use super::errors::CheckoutError;
use crate::domain::billing::PriceType;
use crate::domain::foundation::{CustomerId, PriceId};
use crate::ports::{CatalogReader, CreateCheckoutSessionRequest, CustomerDirectory, PaymentGateway};

/// Command to create a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub price_id: PriceId,
    pub customer_id: CustomerId,
    pub quantity: u32,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSessionResult {
    pub session_id: String,
    pub client_secret: String,
}

/// Handler for creating checkout sessions.
///
/// Nothing is persisted here. Subscriptions appear once the session
/// completes, through the webhook or the verify endpoint.
pub struct CreateCheckoutSessionHandler {
    catalog: Arc<dyn CatalogReader>,
    customers: Arc<dyn CustomerDirectory>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CreateCheckoutSessionHandler {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        customers: Arc<dyn CustomerDirectory>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            customers,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CreateCheckoutSessionResult, CheckoutError> {
        // 1. Validate input
        if cmd.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity);
        }
        validate_return_url(&cmd.return_url)?;

        // 2. Resolve price and customer
        let price = self
            .catalog
            .get_price_by_id(cmd.price_id)
            .await?
            .ok_or(CheckoutError::PriceNotFound(cmd.price_id))?;
        if price.price_type != PriceType::Recurring {
            return Err(CheckoutError::PriceNotRecurring(price.id));
        }

        let customer = self
            .customers
            .get_by_id(cmd.customer_id)
            .await?
            .ok_or(CheckoutError::CustomerNotFound(cmd.customer_id))?;
        let remote_customer_id = customer
            .billable_remote_id()
            .ok_or(CheckoutError::CustomerNotBillable(customer.id))?;

        // 3. Create the remote session
        let created = self
            .gateway
            .create_checkout_session(CreateCheckoutSessionRequest {
                remote_price_id: price.remote_price_id.clone(),
                remote_customer_id: remote_customer_id.to_string(),
                quantity: cmd.quantity,
                return_url: cmd.return_url,
            })
            .await?;

        tracing::info!(
            session_id = %created.session_id,
            customer_id = %customer.id,
            price_id = %price.id,
            quantity = cmd.quantity,
            "Checkout session started"
        );

        Ok(CreateCheckoutSessionResult {
            session_id: created.session_id,
            client_secret: created.client_secret,
        })
    }
}

fn validate_return_url(url: &str) -> Result<(), CheckoutError> {
    let trimmed = url.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(())
    } else {
        Err(CheckoutError::InvalidReturnUrl(url.to_string()))
    }
}
