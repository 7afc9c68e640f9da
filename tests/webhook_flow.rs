//! End-to-end tests driving the axum router with in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use subscription_sync::adapters::http::{app_router, AppState, HttpLimits};
use subscription_sync::adapters::memory::{
    InMemoryCatalog, InMemorySubscriptionRepository, InMemoryWebhookEventRepository,
};
use subscription_sync::adapters::stripe::MockPaymentGateway;
use subscription_sync::application::{
    default_registry, CheckoutMaterializer, CreateCheckoutSessionHandler, ProcessWebhookHandler,
    ProcessingLimits, RetryPolicy, VerifyCheckoutSessionHandler, WebhookDependencies,
};
use subscription_sync::domain::billing::{
    BillingInterval, Customer, Price, PriceType, Product, Recurrence, SubscriptionStatus,
};
use subscription_sync::domain::foundation::{CustomerId, PriceId, ProductId};
use subscription_sync::domain::webhook::{
    RemoteCheckoutSession, RemoteSubscription, WebhookVerifier,
};
use subscription_sync::ports::WebhookEventRepository;

const SIGNING_SECRET: &str = "whsec_integration_secret";
const WEEKLY_PRICE: &str = "price_weekly";
/// 2025-01-01T00:00:00Z
const PERIOD_START: i64 = 1_735_689_600;
/// 2025-01-15T00:00:00Z
const PERIOD_END: i64 = 1_736_899_200;

struct TestApp {
    router: Router,
    verifier: WebhookVerifier,
    events: InMemoryWebhookEventRepository,
    subscriptions: InMemorySubscriptionRepository,
    catalog: InMemoryCatalog,
    gateway: MockPaymentGateway,
    weekly: Price,
    one_time: Price,
}

impl TestApp {
    async fn new() -> Self {
        let catalog = InMemoryCatalog::new();
        let product = Product {
            id: ProductId::new(),
            name: "Coffee Beans".into(),
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
        let one_time = Price::new(
            PriceId::new(),
            product.id,
            900,
            "usd",
            PriceType::OneTime,
            None,
            "price_sampler",
        )
        .unwrap();
        catalog.add_product(product).await;
        catalog.add_price(weekly.clone()).await;
        catalog.add_price(one_time.clone()).await;

        let events = InMemoryWebhookEventRepository::new();
        let subscriptions = InMemorySubscriptionRepository::new();
        let gateway = MockPaymentGateway::new();

        let materializer = Arc::new(CheckoutMaterializer::new(
            Arc::new(subscriptions.clone()),
            Arc::new(catalog.clone()),
            Arc::new(catalog.clone()),
            Arc::new(gateway.clone()),
        ));
        let registry = default_registry(WebhookDependencies {
            subscriptions: Arc::new(subscriptions.clone()),
            catalog: Arc::new(catalog.clone()),
            customers: Arc::new(catalog.clone()),
            gateway: Arc::new(gateway.clone()),
            materializer: materializer.clone(),
        });
        let limits = ProcessingLimits {
            retry: RetryPolicy::new(2, Duration::from_millis(5)),
            ..ProcessingLimits::default()
        };
        let webhooks = ProcessWebhookHandler::new(
            Arc::new(WebhookVerifier::new(secret())),
            Arc::new(events.clone()),
            Arc::new(registry),
            limits,
        );

        let state = AppState::new(
            Arc::new(CreateCheckoutSessionHandler::new(
                Arc::new(catalog.clone()),
                Arc::new(catalog.clone()),
                Arc::new(gateway.clone()),
            )),
            Arc::new(VerifyCheckoutSessionHandler::new(
                Arc::new(gateway.clone()),
                materializer,
            )),
        )
        .with_webhook_provider("stripe", Arc::new(webhooks));

        Self {
            router: app_router(state, HttpLimits::default()),
            verifier: WebhookVerifier::new(secret()),
            events,
            subscriptions,
            catalog,
            gateway,
            weekly,
            one_time,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn deliver_raw(&self, payload: Vec<u8>, signature: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header("Stripe-Signature", signature);
        }
        self.send(request.body(Body::from(payload)).unwrap()).await
    }

    /// Signs and posts an event the way the processor would.
    async fn deliver(&self, event: &Value) -> (StatusCode, Value) {
        let payload = serde_json::to_vec(event).unwrap();
        let signature = self.sign(&payload);
        self.deliver_raw(payload, Some(signature)).await
    }

    fn sign(&self, payload: &[u8]) -> String {
        self.verifier
            .signature_header(chrono::Utc::now().timestamp(), payload)
            .unwrap()
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    async fn add_customer(&self, remote_customer_id: Option<&str>) -> Customer {
        let customer = Customer {
            id: CustomerId::new(),
            email: "buyer@example.com".into(),
            remote_customer_id: remote_customer_id.map(str::to_string),
        };
        self.catalog.add_customer(customer.clone()).await;
        customer
    }
}

fn secret() -> SecretString {
    SecretString::new(SIGNING_SECRET.to_string())
}

fn event(id: &str, event_type: &str, object: Value) -> Value {
    json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "api_version": "2024-06-20",
        "data": { "object": object }
    })
}

fn item(item_id: &str, price_id: &str, quantity: u32) -> Value {
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

fn subscription(id: &str, status: &str, items: Vec<Value>) -> Value {
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

fn checkout_session(id: &str, status: &str, subscription_id: Option<&str>) -> Value {
    json!({
        "object": "checkout.session",
        "id": id,
        "status": status,
        "mode": "subscription",
        "customer": "cus_test",
        "customer_details": { "email": "buyer@example.com" },
        "subscription": subscription_id
    })
}

fn invoice(id: &str, subscription_id: &str) -> Value {
    json!({
        "object": "invoice",
        "id": id,
        "customer": "cus_test",
        "subscription": subscription_id,
        "status": "open",
        "amount_paid": 0,
        "amount_due": 1800,
        "attempt_count": 1,
        "created": PERIOD_START
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Health
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ════════════════════════════════════════════════════════════════════════════
// Authentication and intake
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn bad_signature_is_rejected_without_recording() {
    let app = TestApp::new().await;
    let payload = serde_json::to_vec(&event("evt_1", "customer.created", json!({}))).unwrap();
    let forged = WebhookVerifier::new(SecretString::new("whsec_other".into()))
        .signature_header(chrono::Utc::now().timestamp(), &payload)
        .unwrap();

    let (status, body) = app.deliver_raw(payload, Some(forged)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "INVALID_SIGNATURE" }));
    assert!(app.events.is_empty().await);
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = TestApp::new().await;
    let payload = serde_json::to_vec(&event("evt_1", "customer.created", json!({}))).unwrap();

    let (status, body) = app.deliver_raw(payload, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn signed_garbage_is_rejected_without_recording() {
    let app = TestApp::new().await;
    let payload = b"definitely not json".to_vec();
    let signature = app.sign(&payload);

    let (status, body) = app.deliver_raw(payload, Some(signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MALFORMED_PAYLOAD");
    assert!(app.events.is_empty().await);
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paypal")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UNKNOWN_PROVIDER");
}

#[tokio::test]
async fn oversized_body_is_refused_before_verification() {
    let app = TestApp::new().await;
    let payload = vec![b'x'; 70 * 1024];
    let signature = app.sign(&payload);

    let (status, body) = app.deliver_raw(payload, Some(signature)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "BODY_READ_FAILED");
    assert!(app.events.is_empty().await);
}

// ════════════════════════════════════════════════════════════════════════════
// Subscription lifecycle
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn created_then_updated_reflects_the_update() {
    let app = TestApp::new().await;

    let created = event(
        "evt_created",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );
    let (status, body) = app.deliver(&created).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    let rows = app.subscriptions.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, SubscriptionStatus::Active);
    assert_eq!(rows[0].price_id, app.weekly.id);
    // Two-weekly price from 2025-01-01 delivers on 2025-01-15.
    assert_eq!(rows[0].next_delivery_date.as_unix_secs(), PERIOD_END);

    let updated = event(
        "evt_updated",
        "customer.subscription.updated",
        subscription("sub_1", "past_due", vec![item("si_1", WEEKLY_PRICE, 3)]),
    );
    let (status, _) = app.deliver(&updated).await;
    assert_eq!(status, StatusCode::OK);

    let rows = app.subscriptions.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, SubscriptionStatus::PastDue);
    assert_eq!(rows[0].quantity, 3);
}

#[tokio::test]
async fn duplicate_delivery_is_acknowledged_once() {
    let app = TestApp::new().await;
    let created = event(
        "evt_dup",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );

    let (first, _) = app.deliver(&created).await;
    let (second, body) = app.deliver(&created).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(app.subscriptions.all().await.len(), 1);
    assert_eq!(app.events.len().await, 1);
    assert_eq!(app.events.processed_count().await, 1);
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_create_one_row() {
    let app = TestApp::new().await;
    let created = event(
        "evt_concurrent",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );

    let ((first, _), (second, _)) = tokio::join!(app.deliver(&created), app.deliver(&created));

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(app.subscriptions.all().await.len(), 1);
    assert_eq!(app.events.len().await, 1);
    assert_eq!(app.events.processed_count().await, 1);
}

#[tokio::test]
async fn update_before_create_is_retried_by_the_sender() {
    let app = TestApp::new().await;
    let updated = event(
        "evt_early_update",
        "customer.subscription.updated",
        subscription("sub_1", "past_due", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );

    let (status, body) = app.deliver(&updated).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "PROCESSING_FAILED");
    let record = app
        .events
        .find_by_event_id("evt_early_update")
        .await
        .unwrap()
        .unwrap();
    assert!(!record.processed);

    let created = event(
        "evt_late_create",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );
    assert_eq!(app.deliver(&created).await.0, StatusCode::OK);

    // Redelivery of the same update now applies.
    assert_eq!(app.deliver(&updated).await.0, StatusCode::OK);
    let rows = app.subscriptions.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, SubscriptionStatus::PastDue);
}

#[tokio::test]
async fn deleted_twice_cancels_once() {
    let app = TestApp::new().await;
    let created = event(
        "evt_created",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );
    app.deliver(&created).await;

    let deleted = event(
        "evt_deleted",
        "customer.subscription.deleted",
        subscription("sub_1", "canceled", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );
    assert_eq!(app.deliver(&deleted).await.0, StatusCode::OK);
    let canceled_at = app.subscriptions.all().await[0].canceled_at;
    assert!(canceled_at.is_some());

    // Same event redelivered, then a distinct event with the same content.
    assert_eq!(app.deliver(&deleted).await.0, StatusCode::OK);
    let again = event(
        "evt_deleted_again",
        "customer.subscription.deleted",
        subscription("sub_1", "canceled", vec![item("si_1", WEEKLY_PRICE, 1)]),
    );
    assert_eq!(app.deliver(&again).await.0, StatusCode::OK);

    let rows = app.subscriptions.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, SubscriptionStatus::Canceled);
    assert_eq!(rows[0].canceled_at, canceled_at);
}

#[tokio::test]
async fn resume_after_cancel_is_acknowledged_without_change() {
    let app = TestApp::new().await;
    app.deliver(&event(
        "evt_created",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    ))
    .await;
    app.deliver(&event(
        "evt_deleted",
        "customer.subscription.deleted",
        subscription("sub_1", "canceled", vec![item("si_1", WEEKLY_PRICE, 1)]),
    ))
    .await;

    let (status, _) = app
        .deliver(&event(
            "evt_resumed",
            "customer.subscription.resumed",
            subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.subscriptions.all().await[0].status,
        SubscriptionStatus::Canceled
    );
}

#[tokio::test]
async fn failed_invoice_is_recorded_on_the_subscription() {
    let app = TestApp::new().await;
    app.deliver(&event(
        "evt_created",
        "customer.subscription.created",
        subscription("sub_1", "active", vec![item("si_1", WEEKLY_PRICE, 1)]),
    ))
    .await;

    let (status, _) = app
        .deliver(&event(
            "evt_invoice_failed",
            "invoice.payment_failed",
            invoice("in_1", "sub_1"),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let row = &app.subscriptions.all().await[0];
    assert_eq!(row.billing.failed_payment_count, 1);
    assert_eq!(row.billing.latest_invoice_id.as_deref(), Some("in_1"));
}

#[tokio::test]
async fn unsubscribed_and_unknown_types_are_acknowledged() {
    let app = TestApp::new().await;

    let (known, _) = app
        .deliver(&event(
            "evt_customer",
            "customer.created",
            json!({ "object": "customer", "id": "cus_1" }),
        ))
        .await;
    let (unknown, _) = app
        .deliver(&event("evt_future", "brand_new.thing", json!({ "id": "x" })))
        .await;

    assert_eq!(known, StatusCode::OK);
    assert_eq!(unknown, StatusCode::OK);
    assert_eq!(app.events.processed_count().await, 2);
    assert!(app.subscriptions.all().await.is_empty());
}

// ════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════

fn register_two_item_checkout(app: &TestApp) {
    let remote: RemoteSubscription = serde_json::from_value(subscription(
        "sub_checkout",
        "active",
        vec![
            item("si_known", WEEKLY_PRICE, 2),
            item("si_unknown", "price_not_in_catalog", 1),
        ],
    ))
    .unwrap();
    app.gateway.add_subscription(remote);

    let session: RemoteCheckoutSession = serde_json::from_value(checkout_session(
        "cs_two_items",
        "complete",
        Some("sub_checkout"),
    ))
    .unwrap();
    app.gateway.add_checkout_session(session);
}

#[tokio::test]
async fn checkout_with_one_unknown_price_creates_the_other() {
    let app = TestApp::new().await;
    register_two_item_checkout(&app);

    let (status, _) = app
        .deliver(&event(
            "evt_checkout",
            "checkout.session.completed",
            checkout_session("cs_two_items", "complete", Some("sub_checkout")),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let rows = app.subscriptions.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].remote_item_id.as_deref(), Some("si_known"));
    assert_eq!(rows[0].quantity, 2);
}

#[tokio::test]
async fn verify_session_reports_existing_rows_and_failures() {
    let app = TestApp::new().await;
    register_two_item_checkout(&app);
    app.deliver(&event(
        "evt_checkout",
        "checkout.session.completed",
        checkout_session("cs_two_items", "complete", Some("sub_checkout")),
    ))
    .await;

    let (status, body) = app
        .get("/checkout/verify-session?session_id=cs_two_items")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "cs_two_items");
    assert_eq!(body["status"], "complete");
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 1);
    assert_eq!(body["failures"][0]["remotePriceId"], "price_not_in_catalog");
    assert_eq!(body["failures"][0]["retryable"], false);
    // Verifying again must not duplicate the webhook's row.
    assert_eq!(app.subscriptions.all().await.len(), 1);
}

#[tokio::test]
async fn verify_open_session_is_conflict() {
    let app = TestApp::new().await;
    let open: RemoteCheckoutSession =
        serde_json::from_value(checkout_session("cs_open", "open", None)).unwrap();
    app.gateway.add_checkout_session(open);

    let (status, body) = app.get("/checkout/verify-session?session_id=cs_open").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SESSION_NOT_COMPLETE");
}

#[tokio::test]
async fn verify_unknown_session_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .get("/checkout/verify-session?session_id=cs_missing")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_session_returns_client_secret() {
    let app = TestApp::new().await;
    let customer = app.add_customer(Some("cus_buyer")).await;

    let (status, body) = app
        .post_json(
            "/checkout/create-session",
            json!({
                "priceId": app.weekly.id.to_string(),
                "customerId": customer.id.to_string(),
                "quantity": 2,
                "returnUrl": "https://shop.example.com/return?session_id={CHECKOUT_SESSION_ID}"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["clientSecret"].as_str().unwrap().contains("secret"));
    assert!(body["sessionId"].as_str().unwrap().starts_with("cs_"));
    assert_eq!(app.gateway.call_count("create_checkout_session"), 1);
}

#[tokio::test]
async fn create_session_validates_its_inputs() {
    let app = TestApp::new().await;
    let billable = app.add_customer(Some("cus_buyer")).await;
    let unlinked = app.add_customer(None).await;
    let request = |price: String, customer: String, quantity: u32| {
        json!({
            "priceId": price,
            "customerId": customer,
            "quantity": quantity,
            "returnUrl": "https://shop.example.com/return"
        })
    };

    let (status, body) = app
        .post_json(
            "/checkout/create-session",
            request(PriceId::new().to_string(), billable.id.to_string(), 1),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PRICE_NOT_FOUND");

    let (status, body) = app
        .post_json(
            "/checkout/create-session",
            request(app.weekly.id.to_string(), unlinked.id.to_string(), 1),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "CUSTOMER_NOT_BILLABLE");

    let (status, _) = app
        .post_json(
            "/checkout/create-session",
            request(app.weekly.id.to_string(), billable.id.to_string(), 0),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_json(
            "/checkout/create-session",
            request(app.one_time.id.to_string(), billable.id.to_string(), 1),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "PRICE_NOT_RECURRING");

    assert_eq!(app.gateway.call_count("create_checkout_session"), 0);
}
