//! HTTP adapter - REST API exposure for checkout and webhooks.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{
    handle_billing_webhook, healthz, start_checkout, ApiError, AuthenticatedUser, BillingAppState,
    SIGNATURE_HEADER,
};
pub use routes::billing_router;
