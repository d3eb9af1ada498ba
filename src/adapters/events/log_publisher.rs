//! Log-based entitlement publisher.
//!
//! Emits a structured log line per entitlement change. Downstream systems
//! that want push notification can swap in a queue-backed implementation
//! behind the same port.

use async_trait::async_trait;

use crate::domain::subscription::SubscriptionRecord;
use crate::ports::EntitlementPublisher;

pub struct LogEntitlementPublisher;

#[async_trait]
impl EntitlementPublisher for LogEntitlementPublisher {
    async fn entitlement_changed(&self, record: &SubscriptionRecord) {
        tracing::info!(
            user_id = %record.user_id,
            tier = %record.tier,
            status = %record.status,
            "entitlement changed"
        );
    }
}
