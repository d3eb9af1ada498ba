//! Entitlement change notification port.

use async_trait::async_trait;

use crate::domain::subscription::SubscriptionRecord;

/// Port for announcing entitlement changes to the rest of the system.
///
/// Notification is best-effort: the subscription record is already durable
/// when this fires, so implementations must not fail the webhook response.
#[async_trait]
pub trait EntitlementPublisher: Send + Sync {
    /// Called after a record write was applied.
    async fn entitlement_changed(&self, record: &SubscriptionRecord);
}
