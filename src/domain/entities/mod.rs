//! Core domain entities.
//!
//! - [`User`] - An authoritative user record, identified by an opaque key
//! - [`NewUser`] - Insert payload
//! - [`UserPatch`] - Update payload

pub mod user;

pub use user::{
    MAX_ID_LEN, MAX_ID_LEN_U64, MAX_NAME_LEN, MAX_NAME_LEN_U64, NewUser, User, UserPatch,
    validate_id, validate_name,
};
