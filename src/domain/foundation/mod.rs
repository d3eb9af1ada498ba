//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types used across
//! domain modules.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::UserId;
pub use timestamp::Timestamp;
