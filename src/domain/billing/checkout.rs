//! Checkout session and materialization report.
//!
//! A checkout session lives on the remote side only. It is read once, when
//! it completes, and turned into zero or more local subscriptions.

use serde::{Deserialize, Serialize};

use super::Subscription;

/// Remote checkout session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Open,
    Complete,
    Expired,
}

impl CheckoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStatus::Open => "open",
            CheckoutStatus::Complete => "complete",
            CheckoutStatus::Expired => "expired",
        }
    }

    /// Unknown remote values are treated as not complete.
    pub fn parse(s: &str) -> Self {
        match s {
            "complete" => CheckoutStatus::Complete,
            "expired" => CheckoutStatus::Expired,
            _ => CheckoutStatus::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub remote_price_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub remote_session_id: String,
    pub status: CheckoutStatus,
    pub remote_customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub remote_subscription_id: Option<String>,
    pub line_items: Vec<CheckoutLineItem>,
    pub return_url: Option<String>,
}

impl CheckoutSession {
    pub fn is_complete(&self) -> bool {
        self.status == CheckoutStatus::Complete
    }
}

/// Why a single line item could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemFailure {
    pub remote_price_id: String,
    pub reason: String,
    /// True if redelivery may succeed (store outage, lost race).
    pub retryable: bool,
}

/// Per-session outcome. Line items fail individually; the rest still land.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationReport {
    pub created: Vec<Subscription>,
    /// Rows already materialized by an earlier delivery or `subscription.created`.
    pub existing: Vec<Subscription>,
    pub failures: Vec<LineItemFailure>,
}

impl MaterializationReport {
    pub fn has_retryable_failure(&self) -> bool {
        self.failures.iter().any(|f| f.retryable)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.created.iter().chain(self.existing.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(retryable: bool) -> LineItemFailure {
        LineItemFailure {
            remote_price_id: "price_x".into(),
            reason: "boom".into(),
            retryable,
        }
    }

    #[test]
    fn unknown_checkout_status_is_not_complete() {
        assert_eq!(CheckoutStatus::parse("complete"), CheckoutStatus::Complete);
        assert_eq!(CheckoutStatus::parse("something_new"), CheckoutStatus::Open);
    }

    #[test]
    fn retryable_failure_is_detected() {
        let mut report = MaterializationReport::default();
        report.failures.push(failure(false));
        assert!(!report.has_retryable_failure());

        report.failures.push(failure(true));
        assert!(report.has_retryable_failure());
    }
}
