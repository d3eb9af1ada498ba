//! Axum router configuration for the billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_billing_webhook, healthz, start_checkout, BillingAppState};

/// Create the billing API router.
///
/// # Routes
///
/// ## User endpoints (bearer token required)
/// - `POST /api/checkout` - Start a hosted checkout session
///
/// ## Webhook endpoints (no auth, signature verified)
/// - `POST /api/webhooks/billing` - Process a signed billing event
///
/// ## Operational
/// - `GET /healthz` - Liveness probe
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/api", api_routes())
        .route("/healthz", get(healthz))
}

fn api_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/webhooks/billing", post(handle_billing_webhook))
}
