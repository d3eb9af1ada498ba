//! StartCheckoutHandler - Command handler for initiating a paid checkout.

use std::sync::Arc;

use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::subscription::{BillingError, PriceTable, SubscriptionTier};
use crate::ports::{CheckoutSession, CreateCheckoutRequest, PaymentProvider, SubscriptionStore};

/// Command to start a hosted checkout session for a paid tier.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub user_id: UserId,
    pub email: Option<String>,
    pub tier: SubscriptionTier,
}

/// Result of successful checkout initiation.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub session: CheckoutSession,
}

/// Handler for initiating checkout.
///
/// No entitlement row is written here; the record only changes when the
/// completion webhook arrives. An existing provider customer id is reused
/// so repeat purchases attach to the same customer.
pub struct StartCheckoutHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    prices: PriceTable,
    success_url: String,
    cancel_url: String,
}

impl StartCheckoutHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProvider>,
        prices: PriceTable,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            prices,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, BillingError> {
        if !cmd.tier.is_paid() {
            return Err(BillingError::Validation(ValidationError::invalid_format(
                "tier",
                "free tier cannot be purchased",
            )));
        }

        let price_id = self.prices.price_id_for(cmd.tier).ok_or_else(|| {
            BillingError::Validation(ValidationError::invalid_format(
                "tier",
                format!("no price configured for tier {}", cmd.tier),
            ))
        })?;

        let existing = self.store.get(&cmd.user_id).await?;

        let session = self
            .provider
            .create_checkout_session(CreateCheckoutRequest {
                user_id: cmd.user_id.clone(),
                email: cmd.email,
                tier: cmd.tier,
                existing_customer_id: existing.external_customer_id.clone(),
                price_id: price_id.to_string(),
                success_url: self.success_url.clone(),
                cancel_url: self.cancel_url.clone(),
            })
            .await?;

        tracing::info!(
            user_id = %cmd.user_id,
            tier = %cmd.tier,
            session_id = %session.id,
            "checkout session created"
        );

        Ok(StartCheckoutResult { session })
    }
}
