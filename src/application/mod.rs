//! Application layer - command handlers wiring domain logic to ports.

pub mod handlers;
