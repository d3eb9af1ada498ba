//! In-memory subscription store.
//!
//! Backs tests and local development. Mirrors the Postgres adapter's
//! semantics exactly: conditional writes guarded by the stored
//! `updated_at`, updates by external id never create rows.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{BillingError, SubscriptionPatch, SubscriptionRecord};
use crate::ports::{SubscriptionStore, UpsertOutcome};

/// HashMap-backed store keyed by user id.
pub struct InMemorySubscriptionStore {
    records: RwLock<HashMap<UserId, SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored rows. Absent users reading as free do not count.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, user_id: &UserId) -> Result<SubscriptionRecord, BillingError> {
        let records = self.records.read().await;
        Ok(records
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| SubscriptionRecord::default_free(user_id.clone())))
    }

    async fn upsert_by_user(
        &self,
        user_id: &UserId,
        patch: &SubscriptionPatch,
        event_time: Timestamp,
    ) -> Result<UpsertOutcome, BillingError> {
        let mut records = self.records.write().await;
        match records.get(user_id) {
            Some(existing) => {
                // Strictly newer events only; a redelivery carries the same
                // timestamp and must be a no-op.
                if !event_time.is_after(&existing.updated_at) {
                    return Ok(UpsertOutcome::Stale);
                }
                let next = existing.apply(patch, event_time);
                records.insert(user_id.clone(), next.clone());
                Ok(UpsertOutcome::Applied(next))
            }
            None => {
                let next = SubscriptionRecord::default_free(user_id.clone()).apply(patch, event_time);
                records.insert(user_id.clone(), next.clone());
                Ok(UpsertOutcome::Applied(next))
            }
        }
    }

    async fn upsert_by_external_subscription_id(
        &self,
        subscription_id: &str,
        patch: &SubscriptionPatch,
        event_time: Timestamp,
    ) -> Result<UpsertOutcome, BillingError> {
        let mut records = self.records.write().await;
        // Tombstoned ids still match so redeliveries after a cancel resolve
        // to the record and hit the staleness guard instead of NotFound.
        let matching = records
            .iter()
            .find(|(_, record)| {
                record.external_subscription_id.as_deref() == Some(subscription_id)
                    || record.last_external_subscription_id.as_deref() == Some(subscription_id)
            })
            .map(|(user_id, _)| user_id.clone());

        let user_id = match matching {
            Some(user_id) => user_id,
            None => return Ok(UpsertOutcome::NotFound),
        };

        let existing = records
            .get(&user_id)
            .expect("record disappeared while holding the write lock");
        if !event_time.is_after(&existing.updated_at) {
            return Ok(UpsertOutcome::Stale);
        }
        let next = existing.apply(patch, event_time);
        records.insert(user_id, next.clone());
        Ok(UpsertOutcome::Applied(next))
    }
}
