//! Domain layer - business logic independent of transport and storage.

pub mod foundation;
pub mod subscription;
