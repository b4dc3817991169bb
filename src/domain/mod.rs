//! Domain layer: the user record and the Record Store contracts.
//!
//! - [`entities`] - The [`entities::User`] record and its write payloads
//! - [`repositories`] - Reader (replica) and writer (primary) traits
//!
//! Nothing here knows about PostgreSQL, Redis or HTTP. Concrete adapters live
//! in [`crate::infrastructure`].

pub mod entities;
pub mod repositories;
