//! Stripe-compatible billing API client.
//!
//! Implements the `PaymentProvider` port against the provider's
//! form-encoded REST API. The secret key rides in basic auth; secrets are
//! wrapped in `SecretString` so they never appear in debug output.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::subscription::BillingError;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, PaymentProvider, ProviderSubscription,
};

use super::types::{CheckoutSessionResponse, SubscriptionResponse};

/// Billing API configuration.
#[derive(Clone)]
pub struct BillingApiConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    /// Base URL for the provider API.
    api_base_url: String,
}

impl BillingApiConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Point the client at a different base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// HTTP client for the billing provider.
pub struct BillingApiClient {
    config: BillingApiConfig,
    http_client: reqwest::Client,
}

impl BillingApiClient {
    pub fn new(config: BillingApiConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn read_error(response: reqwest::Response) -> BillingError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "provider API call failed");
        BillingError::Upstream(format!("provider returned {}: {}", status, body))
    }
}

/// Form parameters for a checkout session creation call.
///
/// The user id, email and tier all ride in session metadata: the provider
/// drops `customer_email` when an existing customer is attached, so email
/// correlation cannot rely on it.
fn checkout_session_params(request: &CreateCheckoutRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("metadata[user_id]", request.user_id.to_string()),
        ("metadata[tier]", request.tier.as_str().to_string()),
    ];

    if let Some(email) = &request.email {
        params.push(("metadata[email]", email.clone()));
    }

    // Reuse the provider customer when one exists; otherwise pre-fill
    // the email so the provider creates one at payment time.
    match (&request.existing_customer_id, &request.email) {
        (Some(customer_id), _) => params.push(("customer", customer_id.clone())),
        (None, Some(email)) => params.push(("customer_email", email.clone())),
        (None, None) => {}
    }

    params
}

#[async_trait]
impl PaymentProvider for BillingApiClient {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = checkout_session_params(&request);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| BillingError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let session: CheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| BillingError::Upstream(format!("invalid session response: {}", e)))?;

        let checkout_url = session
            .url
            .ok_or_else(|| BillingError::Upstream("session response missing url".to_string()))?;

        tracing::info!(session_id = %session.id, "checkout session created");

        Ok(CheckoutSession {
            id: session.id,
            url: checkout_url,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| BillingError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let sub: SubscriptionResponse = response
            .json()
            .await
            .map_err(|e| BillingError::Upstream(format!("invalid subscription response: {}", e)))?;

        Ok(ProviderSubscription {
            price_id: sub.price_id().map(str::to_string),
            id: sub.id,
            customer: sub.customer,
            status: sub.status,
            current_period_end: sub.current_period_end,
        })
    }
}
