//! Record Store contracts.
//!
//! The store has two logical endpoints and the traits mirror that split so the
//! accessor, not the caller, picks the endpoint for each operation:
//!
//! - [`UserReader`] - Point lookups, served by the read replica
//! - [`UserWriter`] - Insert, update and delete, served by the primary
//!
//! Implementations live in `crate::infrastructure::persistence`. Mocks are
//! generated via `mockall` for unit tests.

pub mod user_repository;

pub use user_repository::{UserReader, UserWriter};

#[cfg(test)]
pub use user_repository::{MockUserReader, MockUserWriter};
