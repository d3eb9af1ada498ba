//! Subscription tier definitions and price resolution.
//!
//! The tier is the feature-gating dimension of an entitlement record. Price
//! resolution maps the provider's opaque price identifiers onto tiers using
//! a static table supplied by configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Subscription tier.
///
/// Determines which features a user may use, independent of billing health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// Default tier for users with no paid subscription.
    Free,

    /// Individual paid tier.
    PowerUser,

    /// Team paid tier.
    Team,
}

impl SubscriptionTier {
    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Returns the wire name for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::PowerUser => "power_user",
            SubscriptionTier::Team => "team",
        }
    }

    /// Parses a tier from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionTier::Free),
            "power_user" => Some(SubscriptionTier::PowerUser),
            "team" => Some(SubscriptionTier::Team),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static price-id-to-tier table.
///
/// Built once from configuration at process start and shared by the checkout
/// initiator and the webhook handlers. Resolution is total in both
/// directions: unknown inputs yield `None` so callers decide fail-hard vs
/// fail-soft per operation.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    by_price_id: HashMap<String, SubscriptionTier>,
    by_tier: HashMap<SubscriptionTier, String>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a price id for a paid tier. Free has no price id.
    pub fn with_price(mut self, price_id: impl Into<String>, tier: SubscriptionTier) -> Self {
        let price_id = price_id.into();
        self.by_price_id.insert(price_id.clone(), tier);
        self.by_tier.insert(tier, price_id);
        self
    }

    /// Resolves a provider price id to a tier.
    pub fn resolve(&self, price_id: &str) -> Option<SubscriptionTier> {
        self.by_price_id.get(price_id).copied()
    }

    /// Returns the configured price id for a tier, if any.
    pub fn price_id_for(&self, tier: SubscriptionTier) -> Option<&str> {
        self.by_tier.get(&tier).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriceTable {
        PriceTable::new()
            .with_price("price_power_monthly", SubscriptionTier::PowerUser)
            .with_price("price_team_monthly", SubscriptionTier::Team)
    }

    #[test]
    fn free_tier_is_not_paid() {
        assert!(!SubscriptionTier::Free.is_paid());
    }

    #[test]
    fn paid_tiers_are_paid() {
        assert!(SubscriptionTier::PowerUser.is_paid());
        assert!(SubscriptionTier::Team.is_paid());
    }

    #[test]
    fn tier_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionTier::PowerUser).unwrap();
        assert_eq!(json, "\"power_user\"");
    }

    #[test]
    fn tier_deserializes_from_snake_case() {
        let tier: SubscriptionTier = serde_json::from_str("\"team\"").unwrap();
        assert_eq!(tier, SubscriptionTier::Team);
    }

    #[test]
    fn parse_rejects_unknown_tier() {
        assert_eq!(SubscriptionTier::parse("enterprise"), None);
    }

    #[test]
    fn resolve_maps_known_price_ids() {
        let table = table();
        assert_eq!(
            table.resolve("price_power_monthly"),
            Some(SubscriptionTier::PowerUser)
        );
        assert_eq!(
            table.resolve("price_team_monthly"),
            Some(SubscriptionTier::Team)
        );
    }

    #[test]
    fn resolve_returns_none_for_unknown_price_id() {
        assert_eq!(table().resolve("price_retired_2019"), None);
    }

    #[test]
    fn price_id_lookup_by_tier() {
        let table = table();
        assert_eq!(
            table.price_id_for(SubscriptionTier::Team),
            Some("price_team_monthly")
        );
        assert_eq!(table.price_id_for(SubscriptionTier::Free), None);
    }
}
