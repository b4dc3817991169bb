//! User entity and write payloads.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;

pub const MAX_ID_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 255;

// `validator` length rules take `u64`.
pub const MAX_ID_LEN_U64: u64 = MAX_ID_LEN as u64;
pub const MAX_NAME_LEN_U64: u64 = MAX_NAME_LEN as u64;

/// A user record as held by the Record Store.
///
/// This is also the shape of a cache entry: the accessor stores the JSON
/// form (`{"id": "...", "name": "..."}`) and rebuilds the record from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Input data for inserting a user on the primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: String,
    pub name: String,
}

impl NewUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the id or name is empty or too long.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_id(&self.id)?;
        validate_name(&self.name)
    }
}

/// Replacement values for an existing user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPatch {
    pub name: String,
}

impl UserPatch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the name is empty or too long.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)
    }
}

/// Checks that a key is usable for both the store and the cache.
pub fn validate_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::bad_request(
            "User id must not be empty",
            json!({ "field": "id" }),
        ));
    }

    if id.chars().count() > MAX_ID_LEN {
        return Err(AppError::bad_request(
            "User id is too long",
            json!({ "field": "id", "max": MAX_ID_LEN }),
        ));
    }

    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::bad_request(
            "User name must not be empty",
            json!({ "field": "name" }),
        ));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request(
            "User name is too long",
            json!({ "field": "name", "max": MAX_NAME_LEN }),
        ));
    }

    Ok(())
}
