//! Command handlers, grouped by concern.

pub mod billing;
