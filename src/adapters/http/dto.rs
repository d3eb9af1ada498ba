//! HTTP DTOs (Data Transfer Objects) for the billing endpoints.
//!
//! These types define the JSON request/response structure and form the
//! boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::SubscriptionTier;

/// Request to start a hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// The paid tier to purchase.
    pub tier: SubscriptionTier,
}

/// Response for a created checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page URL the client redirects to.
    pub url: String,
    /// Provider's session id, for client-side reconciliation.
    pub session_id: String,
}

/// Acknowledgement body for webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_request_deserializes() {
        let request: CheckoutRequest = serde_json::from_str(r#"{"tier": "power_user"}"#).unwrap();
        assert_eq!(request.tier, SubscriptionTier::PowerUser);
    }

    #[test]
    fn checkout_request_rejects_unknown_tier() {
        let result = serde_json::from_str::<CheckoutRequest>(r#"{"tier": "enterprise"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn checkout_response_serializes() {
        let response = CheckoutResponse {
            url: "https://checkout.example.com/cs_1".to_string(),
            session_id: "cs_1".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""url":"https://checkout.example.com/cs_1""#));
        assert!(json.contains(r#""session_id":"cs_1""#));
    }

    #[test]
    fn webhook_ack_serializes() {
        let json = serde_json::to_string(&WebhookAckResponse { received: true }).unwrap();
        assert_eq!(json, r#"{"received":true}"#);
    }

    #[test]
    fn error_response_serializes() {
        let response = ErrorResponse::new("INVALID_SIGNATURE", "Invalid signature");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("INVALID_SIGNATURE"));
    }
}
