//! API route configuration.

use crate::api::handlers::{
    create_user_handler, delete_user_handler, get_user_handler, update_user_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// User routes.
///
/// # Endpoints
///
/// - `POST   /users`        - Create a user (primary)
/// - `GET    /users/{id}`   - Look up a user (cache, then replica)
/// - `PUT    /users/{id}`   - Rename a user (primary, then invalidate)
/// - `DELETE /users/{id}`   - Delete a user (primary, then invalidate)
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(create_user_handler)).route(
        "/users/{id}",
        get(get_user_handler)
            .put(update_user_handler)
            .delete(delete_user_handler),
    )
}
