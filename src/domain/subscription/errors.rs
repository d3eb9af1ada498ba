//! Billing error taxonomy.
//!
//! Every failure in the billing flows maps onto one of these variants. The
//! HTTP status mapping doubles as the provider's retry contract: 2xx
//! acknowledges, 4xx rejects permanently, 5xx asks the provider to retry.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// Errors that occur during checkout initiation and webhook processing.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the acceptable window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required metadata field missing from a webhook event.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Required field missing from a webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Request payload failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Bearer token missing or failed verification.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// No subscription record matched the event's external reference.
    #[error("Subscription not found")]
    SubscriptionNotFound,

    /// The process is misconfigured (missing price id, bad secret).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The payment provider API call failed.
    #[error("Provider error: {0}")]
    Upstream(String),

    /// Event was intentionally skipped (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Persistence(String),
}

impl BillingError {
    /// Returns true if the provider should retry delivering the webhook.
    ///
    /// Only transient failures qualify; signature and payload problems will
    /// fail identically on every redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Persistence(_) | BillingError::Upstream(_)
        )
    }

    /// Maps the error to an HTTP status code.
    ///
    /// Signature and timestamp failures are 400s: a bad signature cannot
    /// become valid on retry, so the provider must not redeliver.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::InvalidSignature
            | BillingError::TimestampOutOfRange
            | BillingError::InvalidTimestamp
            | BillingError::ParseError(_)
            | BillingError::MissingMetadata(_)
            | BillingError::MissingField(_)
            | BillingError::Validation(_) => StatusCode::BAD_REQUEST,

            BillingError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,

            BillingError::SubscriptionNotFound => StatusCode::NOT_FOUND,

            // Acknowledged as success so the provider stops redelivering.
            BillingError::Ignored(_) => StatusCode::OK,

            BillingError::Upstream(_) => StatusCode::BAD_GATEWAY,

            BillingError::Configuration(_) | BillingError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
