//! Billing event handlers.
//!
//! One handler per event kind, each translating a provider payload into a
//! conditional write against the subscription store. Handlers never trust
//! delivery order; the store's staleness guard decides whether a write
//! lands.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};
use crate::ports::{
    EntitlementPublisher, PaymentProvider, SubscriptionStore, UpsertOutcome,
};

use super::billing_event::{
    BillingEvent, BillingEventKind, CheckoutSessionPayload, InvoicePayload, SubscriptionPayload,
};
use super::errors::BillingError;
use super::router::{BillingEventHandler, HandlerOutcome};
use super::status::SubscriptionStatus;
use super::tier::PriceTable;

/// Activates a paid subscription when a checkout session completes.
///
/// The session payload lacks the price and billing period, so the handler
/// fetches the subscription object from the provider before writing.
pub struct CheckoutCompletedHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    prices: PriceTable,
    publisher: Arc<dyn EntitlementPublisher>,
}

impl CheckoutCompletedHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProvider>,
        prices: PriceTable,
        publisher: Arc<dyn EntitlementPublisher>,
    ) -> Self {
        Self {
            store,
            provider,
            prices,
            publisher,
        }
    }
}

#[async_trait]
impl BillingEventHandler for CheckoutCompletedHandler {
    fn kind(&self) -> BillingEventKind {
        BillingEventKind::CheckoutCompleted
    }

    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, BillingError> {
        let session: CheckoutSessionPayload = event
            .deserialize_object()
            .map_err(|e| BillingError::ParseError(e.to_string()))?;

        let user_id = session
            .user_id()
            .ok_or(BillingError::MissingMetadata("user_id"))?;
        let user_id = UserId::new(user_id)?;

        let subscription_id = session
            .subscription
            .as_deref()
            .ok_or(BillingError::MissingField("subscription"))?;

        let subscription = self.provider.get_subscription(subscription_id).await?;

        let price_id = subscription
            .price_id
            .as_deref()
            .ok_or(BillingError::MissingField("price"))?;
        // Reject rather than guess: activating the wrong tier is worse than
        // bouncing the delivery while the price table gets fixed.
        let tier = self.prices.resolve(price_id).ok_or_else(|| {
            BillingError::Validation(ValidationError::invalid_format(
                "price",
                format!("price id '{}' is not mapped to a tier", price_id),
            ))
        })?;

        let status = SubscriptionStatus::from_provider(&subscription.status);
        let customer_id = session
            .customer
            .clone()
            .or(subscription.customer.clone())
            .ok_or(BillingError::MissingField("customer"))?;

        let patch = super::record::SubscriptionPatch::paid_activation(
            tier,
            status,
            customer_id,
            subscription.id.clone(),
            subscription.current_period_end.map(Timestamp::from_unix_secs),
        );

        let event_time = Timestamp::from_unix_secs(event.created);
        match self
            .store
            .upsert_by_user(&user_id, &patch, event_time)
            .await?
        {
            UpsertOutcome::Applied(record) => {
                tracing::info!(
                    user_id = %record.user_id,
                    tier = %record.tier,
                    event_id = %event.id,
                    "checkout completed, entitlement activated"
                );
                self.publisher.entitlement_changed(&record).await;
                Ok(HandlerOutcome::Applied)
            }
            UpsertOutcome::Stale => {
                tracing::info!(event_id = %event.id, "checkout event older than stored record, skipping");
                Ok(HandlerOutcome::Stale)
            }
            UpsertOutcome::NotFound => {
                // upsert_by_user creates missing rows; this cannot happen.
                Err(BillingError::Persistence(
                    "upsert by user reported not found".to_string(),
                ))
            }
        }
    }
}

/// Refreshes status, tier and period when the provider reports a change.
pub struct SubscriptionUpdatedHandler {
    store: Arc<dyn SubscriptionStore>,
    prices: PriceTable,
    publisher: Arc<dyn EntitlementPublisher>,
}

impl SubscriptionUpdatedHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        prices: PriceTable,
        publisher: Arc<dyn EntitlementPublisher>,
    ) -> Self {
        Self {
            store,
            prices,
            publisher,
        }
    }
}

#[async_trait]
impl BillingEventHandler for SubscriptionUpdatedHandler {
    fn kind(&self) -> BillingEventKind {
        BillingEventKind::SubscriptionUpdated
    }

    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, BillingError> {
        let subscription: SubscriptionPayload = event
            .deserialize_object()
            .map_err(|e| BillingError::ParseError(e.to_string()))?;

        let status = SubscriptionStatus::from_provider(&subscription.status);

        // Fail soft on an unmapped price: keep the previous tier rather
        // than downgrading a paying user over a config gap.
        let tier = match subscription.price_id() {
            Some(price_id) => match self.prices.resolve(price_id) {
                Some(tier) => Some(tier),
                None => {
                    tracing::warn!(
                        price_id = %price_id,
                        subscription_id = %subscription.id,
                        "unmapped price id on update, retaining previous tier"
                    );
                    None
                }
            },
            None => None,
        };

        let patch = super::record::SubscriptionPatch::status_update(
            tier,
            status,
            subscription.current_period_end.map(Timestamp::from_unix_secs),
        );

        let event_time = Timestamp::from_unix_secs(event.created);
        match self
            .store
            .upsert_by_external_subscription_id(&subscription.id, &patch, event_time)
            .await?
        {
            UpsertOutcome::Applied(record) => {
                tracing::info!(
                    user_id = %record.user_id,
                    status = %record.status,
                    event_id = %event.id,
                    "subscription updated"
                );
                self.publisher.entitlement_changed(&record).await;
                Ok(HandlerOutcome::Applied)
            }
            UpsertOutcome::Stale => Ok(HandlerOutcome::Stale),
            UpsertOutcome::NotFound => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    event_id = %event.id,
                    "update for unknown subscription"
                );
                Err(BillingError::SubscriptionNotFound)
            }
        }
    }
}

/// Downgrades to free when a subscription ends.
pub struct SubscriptionCanceledHandler {
    store: Arc<dyn SubscriptionStore>,
    publisher: Arc<dyn EntitlementPublisher>,
}

impl SubscriptionCanceledHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        publisher: Arc<dyn EntitlementPublisher>,
    ) -> Self {
        Self { store, publisher }
    }
}

#[async_trait]
impl BillingEventHandler for SubscriptionCanceledHandler {
    fn kind(&self) -> BillingEventKind {
        BillingEventKind::SubscriptionCanceled
    }

    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, BillingError> {
        let subscription: SubscriptionPayload = event
            .deserialize_object()
            .map_err(|e| BillingError::ParseError(e.to_string()))?;

        let patch = super::record::SubscriptionPatch::cancellation();
        let event_time = Timestamp::from_unix_secs(event.created);

        match self
            .store
            .upsert_by_external_subscription_id(&subscription.id, &patch, event_time)
            .await?
        {
            UpsertOutcome::Applied(record) => {
                tracing::info!(
                    user_id = %record.user_id,
                    event_id = %event.id,
                    "subscription canceled, entitlement reset to free"
                );
                self.publisher.entitlement_changed(&record).await;
                Ok(HandlerOutcome::Applied)
            }
            UpsertOutcome::Stale => Ok(HandlerOutcome::Stale),
            // Redeliveries match the tombstoned id and come back Stale, so
            // NotFound here means the subscription was never linked at all.
            UpsertOutcome::NotFound => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    event_id = %event.id,
                    "cancel for unknown subscription"
                );
                Err(BillingError::SubscriptionNotFound)
            }
        }
    }
}

/// Marks a record past due when a renewal charge fails.
///
/// Tier and access are untouched; an explicit cancel or update event
/// drives any downgrade.
pub struct InvoicePaymentFailedHandler {
    store: Arc<dyn SubscriptionStore>,
    publisher: Arc<dyn EntitlementPublisher>,
}

impl InvoicePaymentFailedHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        publisher: Arc<dyn EntitlementPublisher>,
    ) -> Self {
        Self { store, publisher }
    }
}

#[async_trait]
impl BillingEventHandler for InvoicePaymentFailedHandler {
    fn kind(&self) -> BillingEventKind {
        BillingEventKind::InvoicePaymentFailed
    }

    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, BillingError> {
        let invoice: InvoicePayload = event
            .deserialize_object()
            .map_err(|e| BillingError::ParseError(e.to_string()))?;

        let subscription_id = match invoice.subscription.as_deref() {
            Some(id) => id,
            // One-off invoices carry no subscription reference.
            None => {
                return Ok(HandlerOutcome::Skipped(
                    "invoice not tied to a subscription".to_string(),
                ));
            }
        };

        let patch = super::record::SubscriptionPatch::past_due();
        let event_time = Timestamp::from_unix_secs(event.created);

        match self
            .store
            .upsert_by_external_subscription_id(subscription_id, &patch, event_time)
            .await?
        {
            UpsertOutcome::Applied(record) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    event_id = %event.id,
                    "renewal payment failed, record marked past due"
                );
                self.publisher.entitlement_changed(&record).await;
                Ok(HandlerOutcome::Applied)
            }
            UpsertOutcome::Stale => Ok(HandlerOutcome::Stale),
            UpsertOutcome::NotFound => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    event_id = %event.id,
                    "payment failure for unknown subscription, acknowledging"
                );
                Ok(HandlerOutcome::Skipped(format!(
                    "no record for subscription {}",
                    subscription_id
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::domain::subscription::billing_event::BillingEventBuilder;
    use crate::domain::subscription::record::{SubscriptionPatch, SubscriptionRecord};
    use crate::domain::subscription::tier::SubscriptionTier;
    use crate::ports::{CheckoutSession, CreateCheckoutRequest, ProviderSubscription};
    use serde_json::json;
    use std::sync::Mutex;

    struct StubProvider {
        subscription: ProviderSubscription,
    }

    #[async_trait]
    impl PaymentProvider for StubProvider {
        async fn create_checkout_session(
            &self,
            _request: CreateCheckoutRequest,
        ) -> Result<CheckoutSession, BillingError> {
            unreachable!("handlers never create sessions")
        }

        async fn get_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<ProviderSubscription, BillingError> {
            Ok(self.subscription.clone())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<SubscriptionRecord>>,
    }

    #[async_trait]
    impl EntitlementPublisher for RecordingPublisher {
        async fn entitlement_changed(&self, record: &SubscriptionRecord) {
            self.published.lock().unwrap().push(record.clone());
        }
    }

    fn prices() -> PriceTable {
        PriceTable::new()
            .with_price("price_power", SubscriptionTier::PowerUser)
            .with_price("price_team", SubscriptionTier::Team)
    }

    fn provider_sub(price_id: &str) -> ProviderSubscription {
        ProviderSubscription {
            id: "sub_1".to_string(),
            customer: Some("cus_1".to_string()),
            status: "active".to_string(),
            price_id: Some(price_id.to_string()),
            current_period_end: Some(1738368000),
        }
    }

    fn checkout_event(created: i64) -> BillingEvent {
        BillingEventBuilder::new()
            .event_type("checkout.session.completed")
            .created(created)
            .object(json!({
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": {"user_id": "u-1"}
            }))
            .build()
    }

    async fn seed_paid_record(store: &InMemorySubscriptionStore) -> SubscriptionRecord {
        let user = UserId::new("u-1").unwrap();
        let patch = SubscriptionPatch::paid_activation(
            SubscriptionTier::PowerUser,
            SubscriptionStatus::Active,
            "cus_1",
            "sub_1",
            Some(Timestamp::from_unix_secs(1738368000)),
        );
        match store
            .upsert_by_user(&user, &patch, Timestamp::from_unix_secs(1704067200))
            .await
            .unwrap()
        {
            UpsertOutcome::Applied(record) => record,
            other => panic!("seed failed: {:?}", other),
        }
    }

    #[tokio::test]
    async fn checkout_completed_activates_paid_tier() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = CheckoutCompletedHandler::new(
            store.clone(),
            Arc::new(StubProvider {
                subscription: provider_sub("price_power"),
            }),
            prices(),
            publisher.clone(),
        );

        let outcome = handler.handle(&checkout_event(1704067200)).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Applied);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.tier, SubscriptionTier::PowerUser);
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn checkout_without_user_metadata_is_rejected() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let handler = CheckoutCompletedHandler::new(
            store,
            Arc::new(StubProvider {
                subscription: provider_sub("price_power"),
            }),
            prices(),
            Arc::new(RecordingPublisher::default()),
        );

        let event = BillingEventBuilder::new()
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1"
            }))
            .build();

        let result = handler.handle(&event).await;
        assert!(matches!(result, Err(BillingError::MissingMetadata("user_id"))));
    }

    #[tokio::test]
    async fn checkout_with_unmapped_price_is_rejected_as_invalid() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let handler = CheckoutCompletedHandler::new(
            store.clone(),
            Arc::new(StubProvider {
                subscription: provider_sub("price_retired"),
            }),
            prices(),
            Arc::new(RecordingPublisher::default()),
        );

        let result = handler.handle(&checkout_event(1704067200)).await;

        assert!(matches!(result, Err(BillingError::Validation(_))));
        // Nothing was written.
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.tier, SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn update_refreshes_status_and_period() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = SubscriptionUpdatedHandler::new(store.clone(), prices(), publisher.clone());

        let event = BillingEventBuilder::new()
            .event_type("customer.subscription.updated")
            .created(1704153600)
            .object(json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": "past_due",
                "current_period_end": 1740960000,
                "items": {"data": [{"price": {"id": "price_power"}}]}
            }))
            .build();

        let outcome = handler.handle(&event).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Applied);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::PastDue);
        assert_eq!(
            record.current_period_end,
            Some(Timestamp::from_unix_secs(1740960000))
        );
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_with_unmapped_price_keeps_previous_tier() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let handler = SubscriptionUpdatedHandler::new(
            store.clone(),
            prices(),
            Arc::new(RecordingPublisher::default()),
        );

        let event = BillingEventBuilder::new()
            .event_type("customer.subscription.updated")
            .created(1704153600)
            .object(json!({
                "id": "sub_1",
                "status": "active",
                "items": {"data": [{"price": {"id": "price_unknown"}}]}
            }))
            .build();

        let outcome = handler.handle(&event).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Applied);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.tier, SubscriptionTier::PowerUser);
    }

    #[tokio::test]
    async fn stale_update_is_a_noop() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let handler = SubscriptionUpdatedHandler::new(
            store.clone(),
            prices(),
            Arc::new(RecordingPublisher::default()),
        );

        // Event timestamp predates the stored record.
        let event = BillingEventBuilder::new()
            .event_type("customer.subscription.updated")
            .created(1703980800)
            .object(json!({
                "id": "sub_1",
                "status": "canceled",
                "items": {"data": []}
            }))
            .build();

        let outcome = handler.handle(&event).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Stale);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn update_for_unknown_subscription_is_not_found() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let handler = SubscriptionUpdatedHandler::new(
            store,
            prices(),
            Arc::new(RecordingPublisher::default()),
        );

        let event = BillingEventBuilder::new()
            .event_type("customer.subscription.updated")
            .created(1704153600)
            .object(json!({
                "id": "sub_missing",
                "status": "active",
                "items": {"data": []}
            }))
            .build();

        let result = handler.handle(&event).await;
        assert!(matches!(result, Err(BillingError::SubscriptionNotFound)));
    }

    #[tokio::test]
    async fn cancel_resets_to_free_and_clears_link() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = SubscriptionCanceledHandler::new(store.clone(), publisher.clone());

        let event = BillingEventBuilder::new()
            .event_type("customer.subscription.deleted")
            .created(1704240000)
            .object(json!({
                "id": "sub_1",
                "status": "canceled"
            }))
            .build();

        let outcome = handler.handle(&event).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Applied);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.tier, SubscriptionTier::Free);
        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert!(record.external_subscription_id.is_none());
        assert!(record.current_period_end.is_none());
    }

    #[tokio::test]
    async fn redelivered_cancel_is_a_stale_noop() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let handler =
            SubscriptionCanceledHandler::new(store.clone(), Arc::new(RecordingPublisher::default()));

        let event = BillingEventBuilder::new()
            .event_type("customer.subscription.deleted")
            .created(1704240000)
            .object(json!({"id": "sub_1", "status": "canceled"}))
            .build();

        let first = handler.handle(&event).await.unwrap();
        // The link is cleared now, but the tombstone still resolves sub_1.
        let second = handler.handle(&event).await.unwrap();

        assert_eq!(first, HandlerOutcome::Applied);
        assert_eq!(second, HandlerOutcome::Stale);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.tier, SubscriptionTier::Free);
        assert_eq!(record.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn older_update_after_cancel_is_a_stale_noop() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let cancel_handler =
            SubscriptionCanceledHandler::new(store.clone(), Arc::new(RecordingPublisher::default()));
        let update_handler = SubscriptionUpdatedHandler::new(
            store.clone(),
            prices(),
            Arc::new(RecordingPublisher::default()),
        );

        let cancel = BillingEventBuilder::new()
            .event_type("customer.subscription.deleted")
            .created(1704240000)
            .object(json!({"id": "sub_1", "status": "canceled"}))
            .build();
        cancel_handler.handle(&cancel).await.unwrap();

        // An update created before the cancel arrives late.
        let late_update = BillingEventBuilder::new()
            .event_type("customer.subscription.updated")
            .created(1704153600)
            .object(json!({
                "id": "sub_1",
                "status": "active",
                "items": {"data": [{"price": {"id": "price_power"}}]}
            }))
            .build();

        let outcome = update_handler.handle(&late_update).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Stale);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.tier, SubscriptionTier::Free);
        assert_eq!(record.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn payment_failure_marks_past_due_without_touching_tier() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        seed_paid_record(&store).await;
        let handler =
            InvoicePaymentFailedHandler::new(store.clone(), Arc::new(RecordingPublisher::default()));

        let event = BillingEventBuilder::new()
            .event_type("invoice.payment_failed")
            .created(1704240000)
            .object(json!({
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1"
            }))
            .build();

        let outcome = handler.handle(&event).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Applied);
        let record = store.get(&UserId::new("u-1").unwrap()).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::PastDue);
        assert_eq!(record.tier, SubscriptionTier::PowerUser);
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn one_off_invoice_is_skipped() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let handler =
            InvoicePaymentFailedHandler::new(store, Arc::new(RecordingPublisher::default()));

        let event = BillingEventBuilder::new()
            .event_type("invoice.payment_failed")
            .created(1704240000)
            .object(json!({"id": "in_1", "customer": "cus_1"}))
            .build();

        let outcome = handler.handle(&event).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }
}
