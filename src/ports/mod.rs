//! Ports - Interfaces between the domain and the outside world.
//!
//! Adapters implement these traits; the application layer and the domain
//! handlers depend only on the trait objects.

mod event_publisher;
mod payment_provider;
mod subscription_store;
mod token_verifier;

pub use event_publisher::EntitlementPublisher;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, PaymentProvider, ProviderSubscription,
};
pub use subscription_store::{SubscriptionStore, UpsertOutcome};
pub use token_verifier::{AuthClaims, TokenVerifier};
