//! Billing domain - subscriptions and the catalog records they reference.

mod checkout;
mod delivery;
mod price;
mod status;
mod subscription;

pub use checkout::{
    CheckoutLineItem, CheckoutSession, CheckoutStatus, LineItemFailure, MaterializationReport,
};
pub use delivery::{next_delivery_date, NextDelivery, FALLBACK_DELIVERY_DAYS};
pub use price::{BillingInterval, Customer, Price, PriceType, Product, Recurrence};
pub use status::SubscriptionStatus;
pub use subscription::{
    BillingPeriod, BillingState, NewSubscription, PaymentStatus, Subscription,
};

#[cfg(test)]
pub(crate) use subscription::test_support;
