//! Subscription aggregate.
//!
//! A local subscription row mirrors one item of a remote subscription. Rows
//! are created by checkout materialization or by a `subscription.created`
//! event and are only ever mutated afterwards; cancellation is a status.
//!
//! # Invariants
//!
//! - `(remote_subscription_id, remote_item_id)` is unique when present
//! - status transitions follow [`SubscriptionStatus`]'s state machine
//! - `period.end() >= period.start()`
//! - `version` increases by one on every persisted update

use serde::{Deserialize, Serialize};

use super::SubscriptionStatus;
use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, PriceId, ProductId, StateMachine, SubscriptionId,
    Timestamp, ValidationError,
};

/// Current billing period. End is never before start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    start: Timestamp,
    end: Timestamp,
}

impl BillingPeriod {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if end.is_before(&start) {
            return Err(ValidationError::invalid_format(
                "current_period_end",
                format!(
                    "period end {} precedes start {}",
                    end.as_datetime(),
                    start.as_datetime()
                ),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }
}

/// Outcome of the most recent invoice payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Invoice-derived billing state. Never drives `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingState {
    pub latest_invoice_id: Option<String>,
    pub last_payment_status: Option<PaymentStatus>,
    pub last_payment_at: Option<Timestamp>,
    /// Consecutive failures since the last successful payment.
    pub failed_payment_count: u32,
}

/// Everything needed to create a new subscription row.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub price_id: PriceId,
    pub remote_subscription_id: Option<String>,
    pub remote_item_id: Option<String>,
    pub status: SubscriptionStatus,
    pub quantity: u32,
    pub period: BillingPeriod,
    pub next_delivery_date: Timestamp,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub price_id: PriceId,
    pub remote_subscription_id: Option<String>,
    pub remote_item_id: Option<String>,
    pub status: SubscriptionStatus,
    pub quantity: u32,
    pub period: BillingPeriod,
    pub next_delivery_date: Timestamp,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<Timestamp>,
    pub billing: BillingState,
    /// Optimistic concurrency token.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    pub fn create(id: SubscriptionId, new: NewSubscription) -> Self {
        let now = Timestamp::now();
        let canceled_at = (new.status == SubscriptionStatus::Canceled).then_some(now);
        Self {
            id,
            customer_id: new.customer_id,
            product_id: new.product_id,
            price_id: new.price_id,
            remote_subscription_id: new.remote_subscription_id,
            remote_item_id: new.remote_item_id,
            status: new.status,
            quantity: new.quantity,
            period: new.period,
            next_delivery_date: new.next_delivery_date,
            cancel_at_period_end: new.cancel_at_period_end,
            canceled_at,
            billing: BillingState::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.status == SubscriptionStatus::Canceled
    }

    /// Moves to `target` through the state machine.
    ///
    /// Returns `Ok(false)` when already in `target`.
    pub fn change_status(&mut self, target: SubscriptionStatus) -> Result<bool, DomainError> {
        if self.status == target {
            return Ok(false);
        }
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status, target
                ),
            )
        })?;
        if target == SubscriptionStatus::Canceled && self.canceled_at.is_none() {
            self.canceled_at = Some(Timestamp::now());
        }
        self.touch();
        Ok(true)
    }

    /// Cancels at the given instant. Idempotent: `Ok(false)` if already canceled.
    pub fn cancel(&mut self, at: Timestamp) -> Result<bool, DomainError> {
        if self.is_canceled() {
            return Ok(false);
        }
        self.change_status(SubscriptionStatus::Canceled)?;
        self.canceled_at = Some(at);
        Ok(true)
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.touch();
    }

    pub fn set_period(&mut self, period: BillingPeriod) {
        self.period = period;
        self.touch();
    }

    pub fn set_cancel_at_period_end(&mut self, flag: bool) {
        self.cancel_at_period_end = flag;
        self.touch();
    }

    pub fn reschedule_delivery(&mut self, date: Timestamp) {
        self.next_delivery_date = date;
        self.touch();
    }

    pub fn record_payment_succeeded(&mut self, invoice_id: impl Into<String>, at: Timestamp) {
        self.billing.latest_invoice_id = Some(invoice_id.into());
        self.billing.last_payment_status = Some(PaymentStatus::Paid);
        self.billing.last_payment_at = Some(at);
        self.billing.failed_payment_count = 0;
        self.touch();
    }

    pub fn record_payment_failed(&mut self, invoice_id: impl Into<String>, at: Timestamp) {
        self.billing.latest_invoice_id = Some(invoice_id.into());
        self.billing.last_payment_status = Some(PaymentStatus::Failed);
        self.billing.last_payment_at = Some(at);
        self.billing.failed_payment_count = self.billing.failed_payment_count.saturating_add(1);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
