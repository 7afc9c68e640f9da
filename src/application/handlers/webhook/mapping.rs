//! Mapping from remote processor objects to local subscription rows.
//!
//! Shared by the subscription reconciler and the checkout materializer so
//! both paths build identical rows for the same remote item.

use crate::domain::billing::{
    next_delivery_date, BillingPeriod, NewSubscription, Price, Product, Recurrence, Subscription,
    SubscriptionStatus,
};
use crate::domain::foundation::{CustomerId, SubscriptionId, Timestamp};
use crate::domain::webhook::{RemoteSubscription, RemoteSubscriptionItem, WebhookError};
use crate::ports::CatalogReader;

pub(crate) fn status_from_remote(status: &str) -> Result<SubscriptionStatus, WebhookError> {
    status
        .parse()
        .map_err(|_| WebhookError::MalformedPayload(format!("unknown subscription status {}", status)))
}

pub(crate) fn timestamp_from_remote(
    field: &'static str,
    secs: i64,
) -> Result<Timestamp, WebhookError> {
    Timestamp::from_unix_secs(secs)
        .ok_or_else(|| WebhookError::MalformedPayload(format!("{} out of range: {}", field, secs)))
}

/// Billing period from remote bounds. `None` when either bound is absent.
pub(crate) fn period_from_remote(
    start: Option<i64>,
    end: Option<i64>,
) -> Result<Option<BillingPeriod>, WebhookError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };
    let start = timestamp_from_remote("current_period_start", start)?;
    let end = timestamp_from_remote("current_period_end", end)?;
    BillingPeriod::new(start, end)
        .map(Some)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}

/// Local price and product for a remote price ID.
pub(crate) async fn resolve_price(
    catalog: &dyn CatalogReader,
    remote_price_id: &str,
) -> Result<(Price, Product), WebhookError> {
    let price = catalog
        .get_price_by_remote_id(remote_price_id)
        .await?
        .ok_or_else(|| WebhookError::PriceNotMapped(remote_price_id.to_string()))?;
    let product = catalog
        .get_product_by_id(price.product_id)
        .await?
        .ok_or_else(|| WebhookError::ProductNotFound(price.product_id.to_string()))?;
    Ok((price, product))
}

/// Next delivery from the period start, logging when the fallback applies.
///
/// A period start too close to the end of representable time is malformed.
pub(crate) fn delivery_for(
    remote_subscription_id: &str,
    period_start: Timestamp,
    recurrence: Option<Recurrence>,
) -> Result<Timestamp, WebhookError> {
    let next = next_delivery_date(period_start, recurrence).ok_or_else(|| {
        WebhookError::MalformedPayload(format!(
            "no representable delivery date after {}",
            period_start.as_unix_secs()
        ))
    })?;
    if next.used_fallback {
        tracing::warn!(
            remote_subscription_id,
            "Price has no usable interval, next delivery falls back to one week"
        );
    }
    Ok(next.date)
}

/// Builds, without persisting, the local row for one remote item.
///
/// Local price recurrence wins over the recurrence embedded in the payload.
pub(crate) async fn build_subscription(
    catalog: &dyn CatalogReader,
    customer_id: CustomerId,
    remote: &RemoteSubscription,
    item: &RemoteSubscriptionItem,
) -> Result<Subscription, WebhookError> {
    let (price, product) = resolve_price(catalog, &item.price.id).await?;
    let status = status_from_remote(&remote.status)?;

    let (start, end) = remote.period_for(item);
    let period = period_from_remote(start, end)?
        .ok_or(WebhookError::MissingField("current_period_start"))?;

    let recurrence = price.recurrence.or_else(|| item.price.recurrence());
    let next_delivery = delivery_for(&remote.id, period.start(), recurrence)?;

    Ok(Subscription::create(
        SubscriptionId::new(),
        NewSubscription {
            customer_id,
            product_id: product.id,
            price_id: price.id,
            remote_subscription_id: Some(remote.id.clone()),
            remote_item_id: Some(item.id.clone()),
            status,
            quantity: item.quantity.unwrap_or(1),
            period,
            next_delivery_date: next_delivery,
            cancel_at_period_end: remote.cancel_at_period_end,
        },
    ))
}

/// Collects per-row failures of a multi-row event.
///
/// The event fails with the first retryable error if there is one, else
/// with the first permanent error. Swallowed errors only surface when no
/// row was applied at all.
#[derive(Debug, Default)]
pub(crate) struct RowErrors {
    errors: Vec<WebhookError>,
    applied: usize,
}

impl RowErrors {
    pub fn applied(&mut self) {
        self.applied += 1;
    }

    pub fn push(&mut self, err: WebhookError) {
        self.errors.push(err);
    }

    pub fn record(&mut self, result: Result<(), WebhookError>) {
        match result {
            Ok(()) => self.applied(),
            Err(err) => self.push(err),
        }
    }

    pub fn finish(mut self) -> Result<(), WebhookError> {
        if let Some(pos) = self.errors.iter().position(WebhookError::is_retryable) {
            return Err(self.errors.swap_remove(pos));
        }
        if let Some(pos) = self.errors.iter().position(|e| !e.is_swallowed()) {
            return Err(self.errors.swap_remove(pos));
        }
        if self.applied == 0 && !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_requires_both_bounds() {
        assert_eq!(period_from_remote(Some(1), None), Ok(None));
        assert!(period_from_remote(Some(1), Some(2)).unwrap().is_some());
    }

    #[test]
    fn inverted_period_is_malformed() {
        assert!(matches!(
            period_from_remote(Some(200), Some(100)),
            Err(WebhookError::MalformedPayload(_))
        ));
    }

    #[test]
    fn unknown_status_is_malformed() {
        assert!(matches!(
            status_from_remote("on_fire"),
            Err(WebhookError::MalformedPayload(_))
        ));
        assert_eq!(status_from_remote("past_due"), Ok(SubscriptionStatus::PastDue));
    }

    #[test]
    fn delivery_past_representable_time_is_malformed() {
        let start = Timestamp::from_unix_secs(8_210_266_800_000).unwrap();
        assert!(matches!(
            delivery_for("sub_1", start, None),
            Err(WebhookError::MalformedPayload(_))
        ));
    }

    #[test]
    fn oversized_interval_count_uses_fallback() {
        let start = Timestamp::from_unix_secs(1_735_689_600).unwrap();
        let recurrence = Recurrence::new(crate::domain::billing::BillingInterval::Week, 100_000_000);
        let date = delivery_for("sub_1", start, Some(recurrence)).unwrap();
        assert_eq!(date.as_unix_secs(), 1_735_689_600 + 7 * 86_400);
    }

    #[test]
    fn retryable_error_wins() {
        let mut errors = RowErrors::default();
        errors.push(WebhookError::PriceNotMapped("price_x".into()));
        errors.push(WebhookError::Store("down".into()));
        assert_eq!(errors.finish(), Err(WebhookError::Store("down".into())));
    }

    #[test]
    fn swallowed_errors_surface_only_when_nothing_applied() {
        let mut partial = RowErrors::default();
        partial.applied();
        partial.push(WebhookError::InvalidTransition("canceled".into()));
        assert_eq!(partial.finish(), Ok(()));

        let mut none = RowErrors::default();
        none.push(WebhookError::InvalidTransition("canceled".into()));
        assert!(matches!(none.finish(), Err(WebhookError::InvalidTransition(_))));
    }
}
