//! PostgreSQL implementation of the user repository traits.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PoolSettings;
use crate::domain::entities::{NewUser, User, UserPatch};
use crate::domain::repositories::{UserReader, UserWriter};
use crate::error::AppError;

/// Opens a connection pool against one endpoint of the Record Store.
///
/// # Errors
///
/// Returns the underlying [`sqlx::Error`] if the first connection cannot be
/// established within `settings.connect_timeout`.
pub async fn connect_pool(url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.connect_timeout))
        .idle_timeout(Some(Duration::from_secs(settings.idle_timeout)))
        .max_lifetime(Some(Duration::from_secs(settings.max_lifetime)))
        .connect(url)
        .await
}

/// PostgreSQL repository for the `users` table.
///
/// Which endpoint it talks to is decided by the pool it is built with.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl UserReader for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, (String, String)>("SELECT id, name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|(id, name)| User::new(id, name)))
    }

    async fn ping_replica(&self) -> Result<(), AppError> {
        self.ping().await
    }
}

#[async_trait]
impl UserWriter for PgUserRepository {
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let (id, name) = sqlx::query_as::<_, (String, String)>(
            "INSERT INTO users (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(&new_user.id)
        .bind(&new_user.name)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(User::new(id, name))
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "UPDATE users SET name = $1 WHERE id = $2 RETURNING id, name",
        )
        .bind(&patch.name)
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|(id, name)| User::new(id, name))
            .ok_or_else(|| AppError::not_found("User not found", json!({ "id": id })))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found", json!({ "id": id })));
        }

        Ok(())
    }

    async fn ping_primary(&self) -> Result<(), AppError> {
        self.ping().await
    }
}
