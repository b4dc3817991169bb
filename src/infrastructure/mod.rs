//! Infrastructure layer for external integrations.
//!
//! Concrete adapters for the two external stores the accessor mediates.
//!
//! # Modules
//!
//! - [`cache`] - Cache Store (Redis and no-op implementations)
//! - [`persistence`] - Record Store (PostgreSQL reader/writer pools)

pub mod cache;
pub mod persistence;
