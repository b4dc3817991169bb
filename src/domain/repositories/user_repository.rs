//! Repository traits for user data access.

use crate::domain::entities::{NewUser, User, UserPatch};
use crate::error::AppError;
use async_trait::async_trait;

/// Read side of the Record Store, bound to the replica endpoint.
///
/// The replica may lag the primary; callers get whatever the replica has.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUserRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserReader: Send + Sync {
    /// Finds a user by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(User))` if found
    /// - `Ok(None)` if not found
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Round-trips a trivial query against the replica.
    async fn ping_replica(&self) -> Result<(), AppError>;
}

/// Write side of the Record Store, bound to the primary endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserWriter: Send + Sync {
    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the key already exists.
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Replaces the mutable fields of an existing user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no user has this key.
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn update(&self, id: &str, patch: UserPatch) -> Result<User, AppError>;

    /// Removes a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no user has this key.
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn delete(&self, id: &str) -> Result<(), AppError>;

    /// Round-trips a trivial query against the primary.
    async fn ping_primary(&self) -> Result<(), AppError>;
}
