//! Billing webhook event types.
//!
//! Defines the envelope shared by all provider events plus the per-kind
//! payload schemas. Only fields relevant to entitlement sync are captured;
//! everything else in the provider's event schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Billing webhook event envelope.
///
/// Every event carries an id, a dotted kind string, a creation timestamp
/// and a polymorphic data object whose shape depends on the kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Dotted event kind (e.g. "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the provider created the event (Unix timestamp).
    pub created: i64,

    /// Container for the event-specific object.
    pub data: BillingEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEventData {
    /// The object that triggered the event, polymorphic per kind.
    pub object: serde_json::Value,
}

impl BillingEvent {
    /// Parse the dotted kind string into a known variant.
    pub fn kind(&self) -> BillingEventKind {
        BillingEventKind::from_type(&self.event_type)
    }

    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// The event kinds entitlement sync reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingEventKind {
    /// A checkout session finished and a subscription was created.
    CheckoutCompleted,
    /// An existing subscription changed (status, price, period).
    SubscriptionUpdated,
    /// A subscription ended.
    SubscriptionCanceled,
    /// A renewal charge failed.
    InvoicePaymentFailed,
    /// Any kind without a registered handler.
    Unknown,
}

impl BillingEventKind {
    /// Parse an event kind from the provider's dotted string.
    pub fn from_type(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutCompleted,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionCanceled,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// The provider's dotted string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted => "checkout.session.completed",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionCanceled => "customer.subscription.deleted",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

/// The checkout session object inside a `checkout.session.completed` event.
///
/// The session itself does not carry the price or period; handlers fetch
/// the referenced subscription from the provider for those.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionPayload {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionPayload {
    /// The internal user id attached at session creation time.
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("user_id").map(String::as_str)
    }
}

/// The subscription object inside `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionPayload {
    pub id: String,
    pub customer: Option<String>,
    pub status: String,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl SubscriptionPayload {
    /// The price id on the first subscription item, if present.
    ///
    /// Subscriptions sold through checkout always carry exactly one item.
    pub fn price_id(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .map(|item| item.price.id.as_str())
    }
}

/// The provider's `items` list on a subscription.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItem {
    pub price: ItemPrice,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemPrice {
    pub id: String,
}

/// The invoice object inside an `invoice.payment_failed` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoicePayload {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

/// Builder for creating test BillingEvent instances.
#[cfg(test)]
pub struct BillingEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for BillingEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl BillingEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> BillingEvent {
        BillingEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: BillingEventData {
                object: self.object,
            },
            livemode: self.livemode,
        }
    }
}
