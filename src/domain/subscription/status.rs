//! Subscription status and the provider status mapping.
//!
//! Status is the billing-health dimension of an entitlement record. It is
//! orthogonal to tier: a paid tier can be past due while retaining access
//! until an explicit downgrade arrives from the provider.

use serde::{Deserialize, Serialize};

/// Billing-health state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid up (or on the implicit free default).
    Active,

    /// Payment failed; provider is retrying. Access retained.
    PastDue,

    /// Subscription ended, either by the user or by the provider.
    Canceled,

    /// Payment retries exhausted without cancellation.
    Unpaid,
}

impl SubscriptionStatus {
    /// Maps a provider lifecycle status string to the internal enum.
    ///
    /// Fixed table: `trialing` and `incomplete` map to active,
    /// `incomplete_expired` maps to canceled, the four internal names pass
    /// through. Anything unrecognized defaults to active so a new provider
    /// state never locks a paying user out; that fail-open default is a
    /// deliberate policy choice.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Active,
            "incomplete" => SubscriptionStatus::Active,
            "incomplete_expired" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "unpaid" => SubscriptionStatus::Unpaid,
            _ => SubscriptionStatus::Active,
        }
    }

    /// Returns the wire name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
        }
    }

    /// Parses a status from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "unpaid" => Some(SubscriptionStatus::Unpaid),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trialing_maps_to_active() {
        assert_eq!(
            SubscriptionStatus::from_provider("trialing"),
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn incomplete_maps_to_active() {
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete"),
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn incomplete_expired_maps_to_canceled() {
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn internal_names_pass_through() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_provider("canceled"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_provider("unpaid"),
            SubscriptionStatus::Unpaid
        );
    }

    #[test]
    fn unknown_status_fails_open_to_active() {
        assert_eq!(
            SubscriptionStatus::from_provider("paused_by_new_api"),
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }
}
