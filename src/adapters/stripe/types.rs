//! Response shapes for the provider's REST API.
//!
//! Only the fields entitlement sync reads are declared; the rest of the
//! provider's schema is ignored by serde.

use serde::Deserialize;

/// A checkout session as returned by `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
    /// Hosted payment page URL. Present on freshly created sessions.
    pub url: Option<String>,
}

/// A subscription as returned by `GET /v1/subscriptions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub customer: Option<String>,
    pub status: String,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItemList,
}

impl SubscriptionResponse {
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItemList {
    #[serde(default)]
    pub data: Vec<SubscriptionItemResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItemResponse {
    pub price: PriceResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceResponse {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscription_with_single_item() {
        let json = r#"{
            "id": "sub_123",
            "customer": "cus_456",
            "status": "active",
            "current_period_end": 1738368000,
            "items": {
                "data": [
                    {"price": {"id": "price_abc", "unit_amount": 1900}}
                ],
                "has_more": false
            },
            "cancel_at_period_end": false
        }"#;

        let sub: SubscriptionResponse = serde_json::from_str(json).unwrap();

        assert_eq!(sub.id, "sub_123");
        assert_eq!(sub.price_id(), Some("price_abc"));
        assert_eq!(sub.current_period_end, Some(1738368000));
    }

    #[test]
    fn parses_session_without_url() {
        let json = r#"{"id": "cs_123", "object": "checkout.session"}"#;
        let session: CheckoutSessionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "cs_123");
        assert!(session.url.is_none());
    }
}
