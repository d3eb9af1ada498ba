//! Entitlement change notification adapters.

mod log_publisher;

pub use log_publisher::LogEntitlementPublisher;
