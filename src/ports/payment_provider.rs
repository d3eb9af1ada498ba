//! Payment provider port.
//!
//! Contract for the hosted-checkout payment gateway. The two operations
//! mirror what entitlement sync actually needs: open a checkout session and
//! fetch a subscription object when a webhook payload is incomplete.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;
use crate::domain::subscription::{BillingError, SubscriptionTier};

/// Port for the payment provider API.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a hosted checkout session for a subscription purchase.
    ///
    /// The internal user id travels as session metadata so the completion
    /// webhook can be correlated back to the user.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    /// Fetches a subscription object by its provider id.
    ///
    /// Used by the checkout-completed handler: the session payload names
    /// the subscription but carries neither price nor period.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError>;
}

/// Request to create a checkout session.
///
/// `user_id`, `email` and `tier` all travel as session metadata so the
/// completion webhook can be correlated without further lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Internal user id, attached as session metadata.
    pub user_id: UserId,

    /// Email to pre-fill on the checkout page and echo in metadata. The
    /// pre-fill is ignored when an existing customer id is supplied.
    pub email: Option<String>,

    /// Tier being purchased, echoed in metadata.
    pub tier: SubscriptionTier,

    /// Existing provider customer id, if the user has purchased before.
    pub existing_customer_id: Option<String>,

    /// Provider price id for the tier being purchased.
    pub price_id: String,

    /// Redirect after successful payment.
    pub success_url: String,

    /// Redirect after abandoned checkout.
    pub cancel_url: String,
}

/// A created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub id: String,

    /// URL the user is redirected to for payment.
    pub url: String,
}

/// A subscription object as returned by the provider API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    /// Provider's subscription id.
    pub id: String,

    /// Provider's customer id.
    pub customer: Option<String>,

    /// Raw provider lifecycle status string.
    pub status: String,

    /// Price id on the first subscription item.
    pub price_id: Option<String>,

    /// End of the current billing period (Unix timestamp).
    pub current_period_end: Option<i64>,
}
