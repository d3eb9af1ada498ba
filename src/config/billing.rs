//! Billing configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::subscription::{PriceTable, SubscriptionTier};

/// Billing configuration (payment provider)
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Provider API secret key
    pub secret_key: SecretString,

    /// Webhook signing secret from the provider dashboard
    pub webhook_secret: SecretString,

    /// Price ID for the power user tier
    pub power_user_price_id: Option<String>,

    /// Price ID for the team tier
    pub team_price_id: Option<String>,

    /// Base URL of the site, used to build checkout redirect URLs
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Override for the provider API base URL (tests, mock servers)
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl BillingConfig {
    /// Check if using provider test mode
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_test_")
    }

    /// Builds the price table from the configured price ids.
    pub fn price_table(&self) -> PriceTable {
        let mut table = PriceTable::new();
        if let Some(price_id) = &self.power_user_price_id {
            table = table.with_price(price_id.clone(), SubscriptionTier::PowerUser);
        }
        if let Some(price_id) = &self.team_price_id {
            table = table.with_price(price_id.clone(), SubscriptionTier::Team);
        }
        table
    }

    /// Redirect target after a completed checkout.
    pub fn success_url(&self) -> String {
        format!("{}/billing/success", self.site_url.trim_end_matches('/'))
    }

    /// Redirect target after an abandoned checkout.
    pub fn cancel_url(&self) -> String {
        format!("{}/billing/cancel", self.site_url.trim_end_matches('/'))
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_SECRET_KEY"));
        }
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_WEBHOOK_SECRET"));
        }

        // Key prefixes catch swapped publishable/secret keys early.
        if !self.secret_key.expose_secret().starts_with("sk_") {
            return Err(ValidationError::InvalidBillingKey);
        }
        if !self.webhook_secret.expose_secret().starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }
        if !self.site_url.starts_with("http://") && !self.site_url.starts_with("https://") {
            return Err(ValidationError::InvalidSiteUrl);
        }

        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            secret_key: SecretString::new(String::new()),
            webhook_secret: SecretString::new(String::new()),
            power_user_price_id: None,
            team_price_id: None,
            site_url: default_site_url(),
            api_base_url: None,
        }
    }
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}
