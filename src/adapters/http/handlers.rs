//! HTTP handlers for the billing endpoints.
//!
//! These handlers connect Axum routes to application layer command handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    ProcessBillingEventCommand, ProcessBillingEventHandler, StartCheckoutCommand,
    StartCheckoutHandler,
};
use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::subscription::{BillingError, EventRouter, PriceTable, WebhookVerifier};
use crate::ports::{PaymentProvider, SubscriptionStore, TokenVerifier};

use super::dto::{CheckoutRequest, CheckoutResponse, ErrorResponse, WebhookAckResponse};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Billing-Signature";

/// Shared application state containing all dependencies.
///
/// Cloned per request; everything heavyweight is behind an Arc.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscription_store: Arc<dyn SubscriptionStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub webhook_verifier: Arc<WebhookVerifier>,
    pub event_router: Arc<EventRouter>,
    pub prices: PriceTable,
    pub success_url: String,
    pub cancel_url: String,
}

impl BillingAppState {
    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.subscription_store.clone(),
            self.payment_provider.clone(),
            self.prices.clone(),
            self.success_url.clone(),
            self.cancel_url.clone(),
        )
    }

    pub fn process_billing_event_handler(&self) -> ProcessBillingEventHandler {
        ProcessBillingEventHandler::new(self.webhook_verifier.clone(), self.event_router.clone())
    }
}

/// Authenticated user context extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl axum::extract::FromRequestParts<BillingAppState> for AuthenticatedUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        state: &'life1 BillingAppState,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = parts
                .headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    ApiError(BillingError::Unauthenticated(
                        "missing bearer token".to_string(),
                    ))
                })?;

            let claims = state.token_verifier.verify(token).map_err(ApiError)?;

            Ok(AuthenticatedUser {
                user_id: claims.user_id,
                email: claims.email,
            })
        })
    }
}

/// POST /api/checkout - Start a hosted checkout session for a paid tier.
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // Malformed bodies (unknown tier, bad JSON) are client errors, not the
    // extractor's default 422.
    let Json(request) = payload.map_err(|rejection| {
        BillingError::Validation(ValidationError::invalid_format(
            "body",
            rejection.body_text(),
        ))
    })?;

    let handler = state.start_checkout_handler();
    let cmd = StartCheckoutCommand {
        user_id: user.user_id,
        email: user.email,
        tier: request.tier,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CheckoutResponse {
        url: result.session.url,
        session_id: result.session.id,
    }))
}

/// POST /api/webhooks/billing - Process a signed billing event.
///
/// The body must reach the verifier byte-for-byte as sent, so this handler
/// takes raw `Bytes` rather than a JSON extractor.
pub async fn handle_billing_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(BillingError::MissingField(SIGNATURE_HEADER))?;

    let handler = state.process_billing_event_handler();
    let cmd = ProcessBillingEventCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    handler.handle(cmd).await?;

    Ok(Json(WebhookAckResponse { received: true }))
}

/// GET /healthz - Liveness probe.
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // An intentionally skipped event is still an acknowledgement.
        if let BillingError::Ignored(reason) = &self.0 {
            tracing::info!(reason = %reason, "event ignored");
            return (StatusCode::OK, Json(WebhookAckResponse { received: true }))
                .into_response();
        }

        let status = self.0.status_code();
        let (error_code, message) = match &self.0 {
            BillingError::InvalidSignature => ("INVALID_SIGNATURE", self.0.to_string()),
            BillingError::TimestampOutOfRange => ("TIMESTAMP_OUT_OF_RANGE", self.0.to_string()),
            BillingError::InvalidTimestamp => ("INVALID_TIMESTAMP", self.0.to_string()),
            BillingError::ParseError(_) => ("PARSE_ERROR", self.0.to_string()),
            BillingError::MissingMetadata(_) => ("MISSING_METADATA", self.0.to_string()),
            BillingError::MissingField(_) => ("MISSING_FIELD", self.0.to_string()),
            BillingError::Validation(_) => ("VALIDATION_FAILED", self.0.to_string()),
            BillingError::Unauthenticated(_) => ("AUTHENTICATION_REQUIRED", self.0.to_string()),
            BillingError::SubscriptionNotFound => ("SUBSCRIPTION_NOT_FOUND", self.0.to_string()),
            BillingError::Upstream(_) => ("UPSTREAM_ERROR", self.0.to_string()),
            BillingError::Ignored(_) => unreachable!("handled above"),
            // Internals stay out of response bodies.
            BillingError::Configuration(_) | BillingError::Persistence(_) => {
                tracing::error!(error = %self.0, "internal error");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let body = ErrorResponse::new(error_code, message);
        (status, Json(body)).into_response()
    }
}
