//! PostgreSQL Record Store adapter.
//!
//! One [`PgUserRepository`] is built per endpoint: the instance over the
//! replica pool serves [`crate::domain::repositories::UserReader`], the one
//! over the primary pool serves [`crate::domain::repositories::UserWriter`].

pub mod pg_user_repository;

pub use pg_user_repository::{PgUserRepository, connect_pool};
