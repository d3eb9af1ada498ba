//! The subscription entitlement record.
//!
//! Exactly one logical record exists per user at all times; absence in the
//! store is read as the implicit free default. The record is only ever
//! written by webhook event handlers and never deleted by this subsystem.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::{SubscriptionStatus, SubscriptionTier};

/// One user's entitlement record.
///
/// Invariants:
/// - `external_subscription_id` is non-null iff `tier != free`
/// - transitions to free always clear `external_subscription_id` and
///   `current_period_end`
/// - `updated_at` carries the provider event timestamp on webhook-driven
///   writes and serves as the staleness cursor for out-of-order delivery
/// - clearing the link moves the subscription id into
///   `last_external_subscription_id`, keeping the record reachable for
///   redelivered and out-of-order events referencing the dead subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub last_external_subscription_id: Option<String>,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// The implicit default for a user with no stored record: free tier,
    /// active, no external references.
    pub fn default_free(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            external_customer_id: None,
            external_subscription_id: None,
            last_external_subscription_id: None,
            tier: SubscriptionTier::Free,
            status: SubscriptionStatus::Active,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the tier/external-id coupling invariant.
    pub fn holds_invariants(&self) -> bool {
        let linked = self.external_subscription_id.is_some();
        if self.tier.is_paid() != linked {
            return false;
        }
        // Free records never carry a period end.
        if !self.tier.is_paid() && self.current_period_end.is_some() {
            return false;
        }
        true
    }

    /// Applies a patch to produce the post-write record.
    ///
    /// Shared by store implementations so the field semantics live in one
    /// place; atomicity and the staleness guard remain the store's job.
    pub fn apply(&self, patch: &SubscriptionPatch, event_time: Timestamp) -> Self {
        let mut next = self.clone();
        if let Some(tier) = patch.tier {
            next.tier = tier;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(customer_id) = &patch.external_customer_id {
            next.external_customer_id = Some(customer_id.clone());
        }
        if let Some(subscription_id) = &patch.external_subscription_id {
            next.external_subscription_id = Some(subscription_id.clone());
        }
        if let Some(period_end) = patch.current_period_end {
            next.current_period_end = Some(period_end);
        }
        if patch.clear_external_link {
            // The cleared id stays behind as a tombstone so redelivered
            // events for the dead subscription still find the record and
            // fall out as stale.
            if next.external_subscription_id.is_some() {
                next.last_external_subscription_id = next.external_subscription_id.take();
            }
            next.current_period_end = None;
        }
        next.updated_at = event_time;
        next
    }
}

/// A conditional write against the subscription record.
///
/// `None` fields are left untouched. `clear_external_link` implements the
/// cancellation invariant: the subscription reference and period end are
/// nulled together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionStatus>,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub clear_external_link: bool,
}

impl SubscriptionPatch {
    /// Full paid state written by a completed checkout.
    pub fn paid_activation(
        tier: SubscriptionTier,
        status: SubscriptionStatus,
        customer_id: impl Into<String>,
        subscription_id: impl Into<String>,
        period_end: Option<Timestamp>,
    ) -> Self {
        Self {
            tier: Some(tier),
            status: Some(status),
            external_customer_id: Some(customer_id.into()),
            external_subscription_id: Some(subscription_id.into()),
            current_period_end: period_end,
            clear_external_link: false,
        }
    }

    /// Status/period refresh from a subscription-updated event. The tier is
    /// optional: when the price id could not be resolved the previous tier
    /// is retained.
    pub fn status_update(
        tier: Option<SubscriptionTier>,
        status: SubscriptionStatus,
        period_end: Option<Timestamp>,
    ) -> Self {
        Self {
            tier,
            status: Some(status),
            current_period_end: period_end,
            ..Self::default()
        }
    }

    /// Reset to free on cancellation; clears the external subscription link
    /// and period end together.
    pub fn cancellation() -> Self {
        Self {
            tier: Some(SubscriptionTier::Free),
            status: Some(SubscriptionStatus::Canceled),
            clear_external_link: true,
            ..Self::default()
        }
    }

    /// Mark past due after a failed invoice; everything else untouched.
    pub fn past_due() -> Self {
        Self {
            status: Some(SubscriptionStatus::PastDue),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn paid_record() -> SubscriptionRecord {
        SubscriptionRecord::default_free(user()).apply(
            &SubscriptionPatch::paid_activation(
                SubscriptionTier::PowerUser,
                SubscriptionStatus::Active,
                "cus_1",
                "sub_1",
                Some(Timestamp::from_unix_secs(1735689600)),
            ),
            Timestamp::from_unix_secs(1704067200),
        )
    }

    #[test]
    fn default_free_has_no_external_references() {
        let record = SubscriptionRecord::default_free(user());
        assert_eq!(record.tier, SubscriptionTier::Free);
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert!(record.external_subscription_id.is_none());
        assert!(record.current_period_end.is_none());
        assert!(record.holds_invariants());
    }

    #[test]
    fn paid_activation_sets_all_fields() {
        let record = paid_record();
        assert_eq!(record.tier, SubscriptionTier::PowerUser);
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.external_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.updated_at.as_unix_secs(), 1704067200);
        assert!(record.holds_invariants());
    }

    #[test]
    fn cancellation_clears_link_and_period_end() {
        let record = paid_record().apply(
            &SubscriptionPatch::cancellation(),
            Timestamp::from_unix_secs(1704153600),
        );
        assert_eq!(record.tier, SubscriptionTier::Free);
        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert!(record.external_subscription_id.is_none());
        assert!(record.current_period_end.is_none());
        // The customer reference survives for future checkout reuse.
        assert_eq!(record.external_customer_id.as_deref(), Some("cus_1"));
        assert!(record.holds_invariants());
    }

    #[test]
    fn cancellation_leaves_a_subscription_tombstone() {
        let record = paid_record().apply(
            &SubscriptionPatch::cancellation(),
            Timestamp::from_unix_secs(1704153600),
        );
        assert_eq!(
            record.last_external_subscription_id.as_deref(),
            Some("sub_1")
        );
    }

    #[test]
    fn reactivation_keeps_the_old_tombstone() {
        let record = paid_record()
            .apply(
                &SubscriptionPatch::cancellation(),
                Timestamp::from_unix_secs(1704153600),
            )
            .apply(
                &SubscriptionPatch::paid_activation(
                    SubscriptionTier::Team,
                    SubscriptionStatus::Active,
                    "cus_1",
                    "sub_2",
                    None,
                ),
                Timestamp::from_unix_secs(1704240000),
            );
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_2"));
        // Late deliveries for the canceled subscription still resolve here.
        assert_eq!(
            record.last_external_subscription_id.as_deref(),
            Some("sub_1")
        );
    }

    #[test]
    fn past_due_touches_only_status() {
        let before = paid_record();
        let after = before.apply(
            &SubscriptionPatch::past_due(),
            Timestamp::from_unix_secs(1704240000),
        );
        assert_eq!(after.status, SubscriptionStatus::PastDue);
        assert_eq!(after.tier, before.tier);
        assert_eq!(after.current_period_end, before.current_period_end);
        assert!(after.holds_invariants());
    }

    #[test]
    fn status_update_without_tier_retains_previous_tier() {
        let before = paid_record();
        let after = before.apply(
            &SubscriptionPatch::status_update(
                None,
                SubscriptionStatus::Active,
                Some(Timestamp::from_unix_secs(1738368000)),
            ),
            Timestamp::from_unix_secs(1704240000),
        );
        assert_eq!(after.tier, SubscriptionTier::PowerUser);
        assert_eq!(
            after.current_period_end,
            Some(Timestamp::from_unix_secs(1738368000))
        );
    }

    #[test]
    fn invariant_fails_for_paid_without_link() {
        let mut record = paid_record();
        record.external_subscription_id = None;
        assert!(!record.holds_invariants());
    }

    #[test]
    fn invariant_fails_for_free_with_period_end() {
        let mut record = SubscriptionRecord::default_free(user());
        record.current_period_end = Some(Timestamp::now());
        assert!(!record.holds_invariants());
    }
}
