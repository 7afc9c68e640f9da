//! Price, product and customer records read from the catalog collaborators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, PriceId, ProductId, ValidationError};

/// One-time or recurring billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    OneTime,
    Recurring,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::OneTime => "one_time",
            PriceType::Recurring => "recurring",
        }
    }
}

impl FromStr for PriceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(PriceType::OneTime),
            "recurring" => Ok(PriceType::Recurring),
            other => Err(ValidationError::invalid_format(
                "price_type",
                format!("unknown price type '{}'", other),
            )),
        }
    }
}

/// Unit of a recurring price's billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Day => "day",
            BillingInterval::Week => "week",
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(BillingInterval::Day),
            "week" => Ok(BillingInterval::Week),
            "month" => Ok(BillingInterval::Month),
            "year" => Ok(BillingInterval::Year),
            other => Err(ValidationError::invalid_format(
                "interval",
                format!("unknown billing interval '{}'", other),
            )),
        }
    }
}

/// Billing cadence of a recurring price: every `interval_count` × `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub interval: BillingInterval,
    pub interval_count: u32,
}

impl Recurrence {
    pub fn new(interval: BillingInterval, interval_count: u32) -> Self {
        Self {
            interval,
            interval_count,
        }
    }

    /// Builds a recurrence from loosely typed metadata (remote payloads,
    /// legacy rows). Returns `None` for unknown units or a zero count.
    pub fn from_parts(interval: Option<&str>, interval_count: Option<u32>) -> Option<Self> {
        let interval = interval?.parse().ok()?;
        match interval_count {
            Some(0) => None,
            Some(count) => Some(Self::new(interval, count)),
            None => Some(Self::new(interval, 1)),
        }
    }
}

/// A catalog price mapped to a remote price.
///
/// # Invariants
///
/// - `recurrence` is present iff `price_type` is `Recurring`
/// - `remote_price_id` is non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub product_id: ProductId,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub price_type: PriceType,
    pub recurrence: Option<Recurrence>,
    pub remote_price_id: String,
}

impl Price {
    pub fn new(
        id: PriceId,
        product_id: ProductId,
        amount: i64,
        currency: impl Into<String>,
        price_type: PriceType,
        recurrence: Option<Recurrence>,
        remote_price_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let remote_price_id = remote_price_id.into();
        if remote_price_id.is_empty() {
            return Err(ValidationError::empty_field("remote_price_id"));
        }
        match (price_type, &recurrence) {
            (PriceType::Recurring, None) => {
                return Err(ValidationError::invalid_format(
                    "interval",
                    "recurring price requires interval and interval_count",
                ))
            }
            (PriceType::OneTime, Some(_)) => {
                return Err(ValidationError::invalid_format(
                    "interval",
                    "one-time price cannot carry an interval",
                ))
            }
            (PriceType::Recurring, Some(r)) if r.interval_count == 0 => {
                return Err(ValidationError::out_of_range(
                    "interval_count",
                    1,
                    i64::from(u32::MAX),
                    0,
                ))
            }
            _ => {}
        }
        Ok(Self {
            id,
            product_id,
            amount,
            currency: currency.into(),
            price_type,
            recurrence,
            remote_price_id,
        })
    }
}

/// Catalog product; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub active: bool,
}

/// Local customer mirrored from the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub remote_customer_id: Option<String>,
}

impl Customer {
    /// Remote ID if set and non-empty; checkout requires one.
    pub fn billable_remote_id(&self) -> Option<&str> {
        self.remote_customer_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}
