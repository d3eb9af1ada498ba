//! Billing handlers.
//!
//! ## Commands
//! - Starting a hosted checkout for a paid tier
//! - Processing a signed billing webhook delivery

mod process_billing_event;
mod start_checkout;

pub use process_billing_event::{ProcessBillingEventCommand, ProcessBillingEventHandler};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};
