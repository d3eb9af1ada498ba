//! Subscription domain - entitlement state and webhook processing.
//!
//! Holds the entitlement record, the tier and status vocabularies, the
//! webhook verifier and the event router with its handlers. Everything
//! here is provider-shape-aware but transport-agnostic; HTTP and storage
//! live in the adapters.

mod billing_event;
mod errors;
mod handlers;
mod record;
mod router;
mod status;
mod tier;
mod webhook_verifier;

pub use billing_event::{
    BillingEvent, BillingEventData, BillingEventKind, CheckoutSessionPayload, InvoicePayload,
    ItemPrice, SubscriptionItem, SubscriptionItems, SubscriptionPayload,
};
pub use errors::BillingError;
pub use handlers::{
    CheckoutCompletedHandler, InvoicePaymentFailedHandler, SubscriptionCanceledHandler,
    SubscriptionUpdatedHandler,
};
pub use record::{SubscriptionPatch, SubscriptionRecord};
pub use router::{BillingEventHandler, EventRouter, HandlerOutcome};
pub use status::SubscriptionStatus;
pub use tier::{PriceTable, SubscriptionTier};
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use billing_event::BillingEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
