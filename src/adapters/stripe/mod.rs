//! Stripe-compatible payment provider adapter.

mod client;
mod types;

pub use client::{BillingApiClient, BillingApiConfig};
