//! Entitlement Sync - Subscription entitlement synchronization service
//!
//! Reconciles a payment provider's webhook event stream into a per-user
//! entitlement record, and exposes a checkout endpoint to start paid
//! subscriptions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
