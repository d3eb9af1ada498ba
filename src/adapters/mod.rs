//! Adapters - Concrete implementations of the ports.
//!
//! Each submodule adapts one external concern: the payment provider API,
//! Postgres persistence, JWT verification, HTTP exposure, and in-memory
//! stand-ins for tests.

pub mod auth;
pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
