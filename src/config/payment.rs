//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment processor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Which gateway implementation to wire up
    #[serde(default)]
    pub provider: PaymentProvider,

    /// Processor secret API key
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    /// Webhook signing secret
    #[serde(default = "empty_secret")]
    pub webhook_secret: SecretString,

    /// Processor API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for outbound API calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Supported payment gateway implementations
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[default]
    Stripe,
    /// In-process gateway for local development
    Mock,
}

impl PaymentProvider {
    /// Name used in the webhook route (`/api/webhooks/:provider`)
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Mock => "mock",
        }
    }
}

impl PaymentConfig {
    /// Check if using test mode keys
    pub fn is_test_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using live mode keys
    pub fn is_live_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let webhook_secret = self.webhook_secret.expose_secret();
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__WEBHOOK_SECRET"));
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        if self.provider == PaymentProvider::Stripe {
            let api_key = self.api_key.expose_secret();
            if api_key.is_empty() {
                return Err(ValidationError::MissingRequired("PAYMENT__API_KEY"));
            }
            if !api_key.starts_with("sk_") {
                return Err(ValidationError::InvalidApiKey);
            }
            if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
            {
                return Err(ValidationError::MissingRequired("PAYMENT__API_BASE_URL"));
            }
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProvider::default(),
            api_key: empty_secret(),
            webhook_secret: empty_secret(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
