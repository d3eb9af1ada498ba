//! Service entrypoint: config, pool, wiring, serve.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use entitlement_sync::adapters::auth::JwtTokenVerifier;
use entitlement_sync::adapters::events::LogEntitlementPublisher;
use entitlement_sync::adapters::http::{billing_router, BillingAppState};
use entitlement_sync::adapters::postgres::PostgresSubscriptionStore;
use entitlement_sync::adapters::stripe::{BillingApiClient, BillingApiConfig};
use entitlement_sync::config::{AppConfig, ServerConfig};
use entitlement_sync::domain::subscription::{
    CheckoutCompletedHandler, EventRouter, InvoicePaymentFailedHandler,
    SubscriptionCanceledHandler, SubscriptionUpdatedHandler, WebhookVerifier,
};
use entitlement_sync::ports::{EntitlementPublisher, PaymentProvider, SubscriptionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let store: Arc<dyn SubscriptionStore> = Arc::new(PostgresSubscriptionStore::new(pool));

    let mut api_config = BillingApiConfig::new(config.billing.secret_key.expose_secret());
    if let Some(base_url) = &config.billing.api_base_url {
        api_config = api_config.with_base_url(base_url.clone());
    }
    let provider: Arc<dyn PaymentProvider> = Arc::new(BillingApiClient::new(api_config));

    let publisher: Arc<dyn EntitlementPublisher> = Arc::new(LogEntitlementPublisher);
    let prices = config.billing.price_table();

    let event_router = EventRouter::new()
        .register(Arc::new(CheckoutCompletedHandler::new(
            store.clone(),
            provider.clone(),
            prices.clone(),
            publisher.clone(),
        )))
        .register(Arc::new(SubscriptionUpdatedHandler::new(
            store.clone(),
            prices.clone(),
            publisher.clone(),
        )))
        .register(Arc::new(SubscriptionCanceledHandler::new(
            store.clone(),
            publisher.clone(),
        )))
        .register(Arc::new(InvoicePaymentFailedHandler::new(
            store.clone(),
            publisher.clone(),
        )));

    let state = BillingAppState {
        subscription_store: store,
        payment_provider: provider,
        token_verifier: Arc::new(JwtTokenVerifier::new(
            &config.auth.jwt_secret,
            config.auth.issuer.as_deref(),
        )),
        webhook_verifier: Arc::new(WebhookVerifier::new(
            config.billing.webhook_secret.expose_secret(),
        )),
        event_router: Arc::new(event_router),
        prices,
        success_url: config.billing.success_url(),
        cancel_url: config.billing.cancel_url(),
    };

    let app = billing_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    tracing::info!(%addr, test_mode = config.billing.is_test_mode(), "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
