//! Payment processor objects as they arrive nested in webhook payloads.
//!
//! Only the fields reconciliation needs are captured. Unknown fields are
//! ignored so new processor API versions keep parsing.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{CheckoutLineItem, CheckoutSession, CheckoutStatus, Recurrence};

// ════════════════════════════════════════════════════════════════════════════════
// Shared shapes
// ════════════════════════════════════════════════════════════════════════════════

/// A reference that is either a bare ID or an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object(ExpandedRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExpandedRef {
    pub id: String,
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(obj) => &obj.id,
        }
    }
}

/// `{ "object": "list", "data": [...] }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for RemoteList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteRecurring {
    pub interval: String,
    pub interval_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemotePrice {
    pub id: String,
    pub product: Option<Expandable>,
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    pub recurring: Option<RemoteRecurring>,
}

impl RemotePrice {
    /// Recurrence described by the remote price, if it is usable.
    pub fn recurrence(&self) -> Option<Recurrence> {
        let recurring = self.recurring.as_ref()?;
        Recurrence::from_parts(Some(&recurring.interval), recurring.interval_count)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteSubscription {
    /// `sub_...`
    pub id: String,
    pub customer: Option<Expandable>,
    pub status: String,
    /// Older API versions carry the period on the subscription, newer ones
    /// on each item.
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub items: RemoteList<RemoteSubscriptionItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteSubscriptionItem {
    /// `si_...`
    pub id: String,
    pub price: RemotePrice,
    pub quantity: Option<u32>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

impl RemoteSubscription {
    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(Expandable::id)
    }

    /// Item whose price matches `remote_price_id`.
    pub fn item_for_price(&self, remote_price_id: &str) -> Option<&RemoteSubscriptionItem> {
        self.items
            .data
            .iter()
            .find(|item| item.price.id == remote_price_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&RemoteSubscriptionItem> {
        self.items.data.iter().find(|item| item.id == item_id)
    }

    /// Period bounds for `item`, preferring item-level values.
    pub fn period_for(&self, item: &RemoteSubscriptionItem) -> (Option<i64>, Option<i64>) {
        (
            item.current_period_start.or(self.current_period_start),
            item.current_period_end.or(self.current_period_end),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Invoice
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteInvoice {
    /// `in_...`
    pub id: String,
    pub customer: Option<Expandable>,
    pub subscription: Option<Expandable>,
    pub status: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    #[serde(default)]
    pub attempt_count: u32,
    /// Issue time, not payment time.
    pub created: Option<i64>,
    pub status_transitions: Option<RemoteInvoiceTransitions>,
}

/// When the invoice moved between states, as Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteInvoiceTransitions {
    pub paid_at: Option<i64>,
    pub finalized_at: Option<i64>,
}

impl RemoteInvoice {
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(Expandable::id)
    }

    pub fn paid_at(&self) -> Option<i64> {
        self.status_transitions.as_ref().and_then(|t| t.paid_at)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout session
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteCustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteLineItem {
    pub id: Option<String>,
    pub price: Option<RemotePrice>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteCheckoutSession {
    /// `cs_...`
    pub id: String,
    pub status: Option<String>,
    pub mode: Option<String>,
    pub customer: Option<Expandable>,
    pub customer_email: Option<String>,
    pub customer_details: Option<RemoteCustomerDetails>,
    pub subscription: Option<Expandable>,
    /// Only present when expanded; webhook payloads usually omit it.
    pub line_items: Option<RemoteList<RemoteLineItem>>,
    pub return_url: Option<String>,
    pub client_secret: Option<String>,
}

impl RemoteCheckoutSession {
    pub fn has_line_items(&self) -> bool {
        self.line_items
            .as_ref()
            .is_some_and(|items| !items.data.is_empty())
    }

    /// Domain view of the session. Line items without a price are dropped.
    pub fn to_domain(&self) -> CheckoutSession {
        let line_items = self
            .line_items
            .as_ref()
            .map(|list| {
                list.data
                    .iter()
                    .filter_map(|item| {
                        item.price.as_ref().map(|price| CheckoutLineItem {
                            remote_price_id: price.id.clone(),
                            quantity: item.quantity.unwrap_or(1),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        CheckoutSession {
            remote_session_id: self.id.clone(),
            status: CheckoutStatus::parse(self.status.as_deref().unwrap_or("open")),
            remote_customer_id: self.customer.as_ref().map(|c| c.id().to_string()),
            customer_email: self
                .customer_details
                .as_ref()
                .and_then(|d| d.email.clone())
                .or_else(|| self.customer_email.clone()),
            remote_subscription_id: self.subscription.as_ref().map(|s| s.id().to_string()),
            line_items,
            return_url: self.return_url.clone(),
        }
    }
}
