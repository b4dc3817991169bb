//! Application layer.
//!
//! Holds the cache-aside accessor, the only component that talks to both the
//! cache and the Record Store. HTTP handlers and the admin CLI go through it.
//!
//! - [`services::UserAccessor`] - Reads via cache then replica, writes via primary then invalidate

pub mod services;
