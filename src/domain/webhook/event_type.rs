//! Event types and the catalog of event categories the processor emits.
//!
//! Only a handful of types change local state ([`EventType`]). The rest of
//! the catalog is acknowledged and recorded for audit.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;

/// Event types that mutate local subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    SubscriptionPaused,
    SubscriptionResumed,
    InvoicePaymentSucceeded,
    /// Sent alongside `invoice.payment_succeeded`; handled identically.
    InvoicePaid,
    InvoicePaymentFailed,
    CheckoutSessionCompleted,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::SubscriptionCreated,
        EventType::SubscriptionUpdated,
        EventType::SubscriptionDeleted,
        EventType::SubscriptionPaused,
        EventType::SubscriptionResumed,
        EventType::InvoicePaymentSucceeded,
        EventType::InvoicePaid,
        EventType::InvoicePaymentFailed,
        EventType::CheckoutSessionCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SubscriptionCreated => "customer.subscription.created",
            EventType::SubscriptionUpdated => "customer.subscription.updated",
            EventType::SubscriptionDeleted => "customer.subscription.deleted",
            EventType::SubscriptionPaused => "customer.subscription.paused",
            EventType::SubscriptionResumed => "customer.subscription.resumed",
            EventType::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            EventType::InvoicePaid => "invoice.paid",
            EventType::InvoicePaymentFailed => "invoice.payment_failed",
            EventType::CheckoutSessionCompleted => "checkout.session.completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping used for audit logging of non-business events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Account,
    Balance,
    BillingPortal,
    Charge,
    Dispute,
    Checkout,
    Coupon,
    CreditNote,
    Customer,
    Subscription,
    SubscriptionSchedule,
    Invoice,
    InvoiceItem,
    PaymentIntent,
    PaymentLink,
    PaymentMethod,
    Payout,
    Catalog,
    PromotionCode,
    Quote,
    Refund,
    SetupIntent,
    TaxRate,
    Other,
}

impl EventCategory {
    /// Category from an event type's dotted prefix.
    pub fn of(event_type: &str) -> Self {
        if event_type.starts_with("customer.subscription.") {
            return EventCategory::Subscription;
        }
        if event_type.starts_with("charge.dispute.") {
            return EventCategory::Dispute;
        }
        let prefix = event_type.split('.').next().unwrap_or_default();
        match prefix {
            "account" | "application_fee" => EventCategory::Account,
            "balance" => EventCategory::Balance,
            "billing_portal" => EventCategory::BillingPortal,
            "charge" => EventCategory::Charge,
            "checkout" => EventCategory::Checkout,
            "coupon" => EventCategory::Coupon,
            "credit_note" => EventCategory::CreditNote,
            "customer" => EventCategory::Customer,
            "subscription_schedule" => EventCategory::SubscriptionSchedule,
            "invoice" => EventCategory::Invoice,
            "invoiceitem" => EventCategory::InvoiceItem,
            "payment_intent" => EventCategory::PaymentIntent,
            "payment_link" => EventCategory::PaymentLink,
            "payment_method" => EventCategory::PaymentMethod,
            "payout" => EventCategory::Payout,
            "plan" | "price" | "product" => EventCategory::Catalog,
            "promotion_code" => EventCategory::PromotionCode,
            "quote" => EventCategory::Quote,
            "refund" => EventCategory::Refund,
            "setup_intent" => EventCategory::SetupIntent,
            "tax_rate" => EventCategory::TaxRate,
            _ => EventCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Account => "account",
            EventCategory::Balance => "balance",
            EventCategory::BillingPortal => "billing_portal",
            EventCategory::Charge => "charge",
            EventCategory::Dispute => "dispute",
            EventCategory::Checkout => "checkout",
            EventCategory::Coupon => "coupon",
            EventCategory::CreditNote => "credit_note",
            EventCategory::Customer => "customer",
            EventCategory::Subscription => "subscription",
            EventCategory::SubscriptionSchedule => "subscription_schedule",
            EventCategory::Invoice => "invoice",
            EventCategory::InvoiceItem => "invoice_item",
            EventCategory::PaymentIntent => "payment_intent",
            EventCategory::PaymentLink => "payment_link",
            EventCategory::PaymentMethod => "payment_method",
            EventCategory::Payout => "payout",
            EventCategory::Catalog => "catalog",
            EventCategory::PromotionCode => "promotion_code",
            EventCategory::Quote => "quote",
            EventCategory::Refund => "refund",
            EventCategory::SetupIntent => "setup_intent",
            EventCategory::TaxRate => "tax_rate",
            EventCategory::Other => "other",
        }
    }
}

/// Every event type the processor is known to send to this endpoint.
pub const KNOWN_EVENT_TYPES: &[&str] = &[
    "account.updated",
    "account.application.authorized",
    "account.application.deauthorized",
    "account.external_account.created",
    "account.external_account.deleted",
    "account.external_account.updated",
    "application_fee.created",
    "application_fee.refunded",
    "balance.available",
    "billing_portal.configuration.created",
    "billing_portal.configuration.updated",
    "billing_portal.session.created",
    "charge.captured",
    "charge.expired",
    "charge.failed",
    "charge.pending",
    "charge.refunded",
    "charge.succeeded",
    "charge.updated",
    "charge.dispute.closed",
    "charge.dispute.created",
    "charge.dispute.funds_reinstated",
    "charge.dispute.funds_withdrawn",
    "charge.dispute.updated",
    "charge.refund.updated",
    "checkout.session.async_payment_failed",
    "checkout.session.async_payment_succeeded",
    "checkout.session.completed",
    "checkout.session.expired",
    "coupon.created",
    "coupon.deleted",
    "coupon.updated",
    "credit_note.created",
    "credit_note.updated",
    "credit_note.voided",
    "customer.created",
    "customer.deleted",
    "customer.updated",
    "customer.discount.created",
    "customer.discount.deleted",
    "customer.discount.updated",
    "customer.source.created",
    "customer.source.deleted",
    "customer.source.expiring",
    "customer.source.updated",
    "customer.subscription.created",
    "customer.subscription.deleted",
    "customer.subscription.paused",
    "customer.subscription.pending_update_applied",
    "customer.subscription.pending_update_expired",
    "customer.subscription.resumed",
    "customer.subscription.trial_will_end",
    "customer.subscription.updated",
    "customer.tax_id.created",
    "customer.tax_id.deleted",
    "customer.tax_id.updated",
    "invoice.created",
    "invoice.deleted",
    "invoice.finalization_failed",
    "invoice.finalized",
    "invoice.marked_uncollectible",
    "invoice.paid",
    "invoice.payment_action_required",
    "invoice.payment_failed",
    "invoice.payment_succeeded",
    "invoice.sent",
    "invoice.upcoming",
    "invoice.updated",
    "invoice.voided",
    "invoiceitem.created",
    "invoiceitem.deleted",
    "payment_intent.amount_capturable_updated",
    "payment_intent.canceled",
    "payment_intent.created",
    "payment_intent.partially_funded",
    "payment_intent.payment_failed",
    "payment_intent.processing",
    "payment_intent.requires_action",
    "payment_intent.succeeded",
    "payment_link.created",
    "payment_link.updated",
    "payment_method.attached",
    "payment_method.automatically_updated",
    "payment_method.detached",
    "payment_method.updated",
    "payout.canceled",
    "payout.created",
    "payout.failed",
    "payout.paid",
    "payout.updated",
    "plan.created",
    "plan.deleted",
    "plan.updated",
    "price.created",
    "price.deleted",
    "price.updated",
    "product.created",
    "product.deleted",
    "product.updated",
    "promotion_code.created",
    "promotion_code.updated",
    "quote.accepted",
    "quote.canceled",
    "quote.created",
    "quote.finalized",
    "refund.created",
    "refund.updated",
    "setup_intent.canceled",
    "setup_intent.created",
    "setup_intent.requires_action",
    "setup_intent.setup_failed",
    "setup_intent.succeeded",
    "subscription_schedule.aborted",
    "subscription_schedule.canceled",
    "subscription_schedule.completed",
    "subscription_schedule.created",
    "subscription_schedule.expiring",
    "subscription_schedule.released",
    "subscription_schedule.updated",
    "tax_rate.created",
    "tax_rate.updated",
];

static KNOWN: Lazy<HashSet<&'static str>> = Lazy::new(|| KNOWN_EVENT_TYPES.iter().copied().collect());

pub fn is_known_event_type(event_type: &str) -> bool {
    KNOWN.contains(event_type)
}
