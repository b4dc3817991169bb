//! Handlers for the user endpoints.
//!
//! Each handler is a thin shell around one [`crate::application::services::UserAccessor`]
//! call; caching and endpoint selection happen there.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::user::{
    CreateUserRequest, DeleteUserResponse, UpdateUserRequest, UserResponse,
};
use crate::error::AppError;
use crate::state::AppState;

/// Looks up a user.
///
/// # Endpoint
///
/// `GET /users/{id}`
///
/// Served from the cache when an unexpired entry exists, otherwise from the
/// read replica (and then cached).
///
/// # Errors
///
/// Returns 404 Not Found if the user doesn't exist.
/// Returns 503 Service Unavailable if the replica cannot be reached.
pub async fn get_user_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.accessor.read(&id).await?;
    Ok(Json(user.into()))
}

/// Creates a user on the primary.
///
/// # Endpoint
///
/// `POST /users`
///
/// ```json
/// { "id": "42", "name": "Alice" }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if validation fails.
/// Returns 409 Conflict if the id is taken.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;

    let user = state.accessor.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Renames a user.
///
/// # Endpoint
///
/// `PUT /users/{id}`
///
/// ```json
/// { "name": "Bob" }
/// ```
///
/// # Cache
///
/// The cached entry is invalidated after the primary accepts the update, so the
/// next read goes back to the replica.
///
/// # Errors
///
/// Returns 400 Bad Request if validation fails.
/// Returns 404 Not Found if the user doesn't exist.
pub async fn update_user_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    payload.validate()?;

    let user = state.accessor.update(&id, payload.into()).await?;
    Ok(Json(user.into()))
}

/// Deletes a user.
///
/// # Endpoint
///
/// `DELETE /users/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if the user doesn't exist.
pub async fn delete_user_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    state.accessor.delete(&id).await?;
    Ok(Json(DeleteUserResponse {
        message: "User deleted",
    }))
}
