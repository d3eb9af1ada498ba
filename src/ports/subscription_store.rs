//! Subscription store port.

use async_trait::async_trait;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{BillingError, SubscriptionPatch, SubscriptionRecord};

/// Result of a conditional upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// The write was applied; carries the post-write record.
    Applied(SubscriptionRecord),

    /// The stored record is newer than the event; nothing was written.
    Stale,

    /// No record matched the external subscription reference.
    NotFound,
}

/// Persistence port for subscription entitlement records.
///
/// Writes are conditional on the provider event timestamp: a write whose
/// `event_time` is not newer than the stored `updated_at` is a no-op. That
/// guard plus row-level atomicity is what makes redelivered and reordered
/// webhooks safe without an event log.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetches the record for a user, or the implicit free default when no
    /// row exists. Absence is not an error.
    async fn get(&self, user_id: &UserId) -> Result<SubscriptionRecord, BillingError>;

    /// Upserts keyed by user id. Creates the row if missing; applies the
    /// patch only when `event_time` is newer than the stored `updated_at`.
    async fn upsert_by_user(
        &self,
        user_id: &UserId,
        patch: &SubscriptionPatch,
        event_time: Timestamp,
    ) -> Result<UpsertOutcome, BillingError>;

    /// Conditionally updates the record linked to an external subscription
    /// id. The id matches the active link or the tombstone left by a
    /// cancellation, so redeliveries for a dead subscription resolve to the
    /// record and fail the staleness check instead of reporting `NotFound`.
    /// Returns `NotFound` when no row ever carried the reference; never
    /// creates rows.
    async fn upsert_by_external_subscription_id(
        &self,
        subscription_id: &str,
        patch: &SubscriptionPatch,
        event_time: Timestamp,
    ) -> Result<UpsertOutcome, BillingError>;
}
