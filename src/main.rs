use std::sync::Arc;

use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subscription_sync::adapters::http::{app_router, AppState, HttpLimits};
use subscription_sync::adapters::memory::{
    InMemoryCatalog, InMemorySubscriptionRepository, InMemoryWebhookEventRepository,
};
use subscription_sync::adapters::postgres::{
    self, PostgresCatalog, PostgresSubscriptionRepository, PostgresWebhookEventRepository,
};
use subscription_sync::adapters::stripe::{MockPaymentGateway, StripeConfig, StripeGateway};
use subscription_sync::application::{
    default_registry, CheckoutMaterializer, CreateCheckoutSessionHandler, ProcessWebhookHandler,
    ProcessingLimits, RetryPolicy, VerifyCheckoutSessionHandler, WebhookDependencies,
};
use subscription_sync::config::{AppConfig, LogFormat, PaymentProvider, ServerConfig};
use subscription_sync::domain::webhook::WebhookVerifier;
use subscription_sync::ports::{
    CatalogReader, CustomerDirectory, PaymentGateway, SubscriptionRepository,
    WebhookEventRepository,
};

/// Storage ports, backed by PostgreSQL or by memory.
struct Stores {
    events: Arc<dyn WebhookEventRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CatalogReader>,
    customers: Arc<dyn CustomerDirectory>,
}

fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| server.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn build_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    if !config.database.is_configured() {
        tracing::warn!("No database configured, using in-memory stores");
        let catalog = InMemoryCatalog::new();
        return Ok(Stores {
            events: Arc::new(InMemoryWebhookEventRepository::new()),
            subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
            catalog: Arc::new(catalog.clone()),
            customers: Arc::new(catalog),
        });
    }

    tracing::info!(url = %config.database.redacted_url(), "Connecting to database");
    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        postgres::run_migrations(&pool).await?;
    }
    let catalog = Arc::new(PostgresCatalog::new(pool.clone()));

    Ok(Stores {
        events: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool)),
        catalog: catalog.clone(),
        customers: catalog,
    })
}

fn build_gateway(config: &AppConfig) -> Arc<dyn PaymentGateway> {
    match config.payment.provider {
        PaymentProvider::Stripe => {
            let stripe = StripeConfig::new(config.payment.api_key.clone())
                .with_base_url(config.payment.api_base_url.clone())
                .with_request_timeout(std::time::Duration::from_secs(
                    config.payment.request_timeout_secs,
                ));
            Arc::new(StripeGateway::new(stripe))
        }
        PaymentProvider::Mock => {
            tracing::warn!("Using mock payment gateway");
            Arc::new(MockPaymentGateway::new())
        }
    }
}

fn build_state(config: &AppConfig, stores: Stores, gateway: Arc<dyn PaymentGateway>) -> AppState {
    let materializer = Arc::new(CheckoutMaterializer::new(
        stores.subscriptions.clone(),
        stores.catalog.clone(),
        stores.customers.clone(),
        gateway.clone(),
    ));

    let registry = default_registry(WebhookDependencies {
        subscriptions: stores.subscriptions.clone(),
        catalog: stores.catalog.clone(),
        customers: stores.customers.clone(),
        gateway: gateway.clone(),
        materializer: materializer.clone(),
    });
    tracing::info!(event_types = registry.len(), "Webhook handlers registered");

    let tolerance = i64::try_from(config.webhook.tolerance_secs).unwrap_or(i64::MAX);
    let secret: SecretString = config.payment.webhook_secret.clone();
    let verifier = Arc::new(WebhookVerifier::new(secret).with_tolerance(tolerance));

    let limits = ProcessingLimits {
        retry: RetryPolicy::new(
            config.webhook.retry_max_attempts,
            config.webhook.retry_base_delay(),
        ),
        budget: config.webhook.processing_budget(),
        claim_lease: config.webhook.claim_lease(),
    };

    let webhooks = Arc::new(ProcessWebhookHandler::new(
        verifier,
        stores.events,
        Arc::new(registry),
        limits,
    ));

    AppState::new(
        Arc::new(CreateCheckoutSessionHandler::new(
            stores.catalog,
            stores.customers,
            gateway.clone(),
        )),
        Arc::new(VerifyCheckoutSessionHandler::new(gateway, materializer)),
    )
    .with_webhook_provider(config.payment.provider.as_str(), webhooks)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);

    config.validate()?;
    tracing::info!(
        environment = ?config.server.environment,
        provider = config.payment.provider.as_str(),
        "Configuration loaded"
    );

    let stores = build_stores(&config).await?;
    let gateway = build_gateway(&config);
    let state = build_state(&config, stores, gateway);

    let app = app_router(
        state,
        HttpLimits {
            request_timeout: std::time::Duration::from_secs(config.server.request_timeout_secs),
            max_webhook_body_bytes: config.webhook.max_body_bytes,
        },
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("subscription-sync listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
