//! Shared fixtures for handler tests.

use serde_json::{json, Value};

use crate::adapters::memory::InMemoryCatalog;
use crate::domain::billing::{BillingInterval, Price, PriceType, Product, Recurrence};
use crate::domain::foundation::{PriceId, ProductId};

pub const WEEKLY_PRICE: &str = "price_weekly";
pub const MONTHLY_PRICE: &str = "price_monthly";

/// 2025-01-01T00:00:00Z
pub const PERIOD_START: i64 = 1_735_689_600;
/// 2025-01-15T00:00:00Z
pub const PERIOD_END: i64 = 1_736_899_200;

pub struct SeededCatalog {
    pub catalog: InMemoryCatalog,
    pub product: Product,
    pub weekly: Price,
    pub monthly: Price,
}

/// One product with a two-weekly and a monthly price.
pub async fn seeded_catalog() -> SeededCatalog {
    let catalog = InMemoryCatalog::new();
    let product = Product {
        id: ProductId::new(),
        name: "Coffee Beans".to_string(),
        active: true,
    };
    let weekly = Price::new(
        PriceId::new(),
        product.id,
        1800,
        "usd",
        PriceType::Recurring,
        Some(Recurrence::new(BillingInterval::Week, 2)),
        WEEKLY_PRICE,
    )
    .unwrap();
    let monthly = Price::new(
        PriceId::new(),
        product.id,
        3200,
        "usd",
        PriceType::Recurring,
        Some(Recurrence::new(BillingInterval::Month, 1)),
        MONTHLY_PRICE,
    )
    .unwrap();

    catalog.add_product(product.clone()).await;
    catalog.add_price(weekly.clone()).await;
    catalog.add_price(monthly.clone()).await;

    SeededCatalog {
        catalog,
        product,
        weekly,
        monthly,
    }
}

pub fn item_object(item_id: &str, price_id: &str, quantity: u32) -> Value {
    json!({
        "object": "subscription_item",
        "id": item_id,
        "quantity": quantity,
        "price": {
            "object": "price",
            "id": price_id,
            "recurring": { "interval": "week", "interval_count": 2 }
        }
    })
}

pub fn subscription_object(id: &str, status: &str, items: Vec<Value>) -> Value {
    json!({
        "object": "subscription",
        "id": id,
        "customer": "cus_test",
        "status": status,
        "current_period_start": PERIOD_START,
        "current_period_end": PERIOD_END,
        "cancel_at_period_end": false,
        "items": { "object": "list", "data": items }
    })
}

pub fn invoice_object(id: &str, subscription_id: Option<&str>) -> Value {
    json!({
        "object": "invoice",
        "id": id,
        "customer": "cus_test",
        "subscription": subscription_id,
        "status": "paid",
        "amount_paid": 1800,
        "amount_due": 1800,
        "attempt_count": 1,
        "created": PERIOD_START
    })
}

pub fn checkout_session_object(id: &str, subscription_id: Option<&str>) -> Value {
    json!({
        "object": "checkout.session",
        "id": id,
        "status": "complete",
        "mode": "subscription",
        "customer": "cus_test",
        "customer_details": { "email": "buyer@example.com" },
        "subscription": subscription_id
    })
}
