//! Authentication adapters.

mod jwt;
mod mock;

pub use jwt::JwtTokenVerifier;
pub use mock::StaticTokenVerifier;
