//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` against the Stripe REST API: embedded
//! checkout session creation, and retrieval of checkout sessions and
//! subscriptions for materialization.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let gateway = StripeGateway::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::webhook::{RemoteCheckoutSession, RemoteSubscription};
use crate::ports::{
    CreateCheckoutSessionRequest, CreatedCheckoutSession, GatewayError, GatewayErrorCode,
    PaymentGateway,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    api_base_url: String,

    request_timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe error envelope: `{ "error": { "type", "code", "message" } }`.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Subset of the session object returned on creation.
#[derive(Debug, Deserialize)]
struct CreatedSessionBody {
    id: String,
    client_secret: Option<String>,
}

pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource: &str,
    ) -> Result<T, GatewayError> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(query)
            .send()
            .await
            .map_err(network_error)?;

        read_response(response, resource).await
    }
}

fn network_error(err: reqwest::Error) -> GatewayError {
    GatewayError::network(err.to_string())
}

async fn read_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_status(status.as_u16(), &body, resource))
}

/// Maps a non-2xx Stripe response onto a classified gateway error.
fn error_from_status(status: u16, body: &str, resource: &str) -> GatewayError {
    let detail = serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API returned {}", status));

    let error = match status {
        401 | 403 => GatewayError::authentication(message),
        404 => GatewayError::not_found(resource),
        429 => GatewayError::new(GatewayErrorCode::RateLimitExceeded, message),
        400..=499 => GatewayError::invalid_request(message),
        500..=599 => GatewayError::new(GatewayErrorCode::ProviderError, message),
        _ => GatewayError::new(GatewayErrorCode::Unknown, message),
    };

    match detail.and_then(|d| d.code.or(d.kind)) {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, GatewayError> {
        let params = [
            ("mode", "subscription".to_string()),
            ("ui_mode", "embedded".to_string()),
            ("customer", request.remote_customer_id),
            ("line_items[0][price]", request.remote_price_id),
            ("line_items[0][quantity]", request.quantity.to_string()),
            ("return_url", request.return_url),
        ];

        let response = self
            .http_client
            .post(self.url("checkout/sessions"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(network_error)?;

        let created: CreatedSessionBody = read_response(response, "checkout session").await?;
        let client_secret = created.client_secret.ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                "Stripe did not return a client secret",
            )
        })?;

        tracing::info!(session_id = %created.id, "Checkout session created");
        Ok(CreatedCheckoutSession {
            session_id: created.id,
            client_secret,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<RemoteCheckoutSession, GatewayError> {
        self.get(
            &format!("checkout/sessions/{}", session_id),
            &[("expand[]", "line_items")],
            "checkout session",
        )
        .await
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<RemoteSubscription, GatewayError> {
        self.get(
            &format!("subscriptions/{}", subscription_id),
            &[],
            "subscription",
        )
        .await
    }
}
