//! Handler for the health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health with per-store checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: Both Record Store endpoints answer. `status` is `healthy`,
///   or `degraded` when only the cache is failing, since reads still succeed
///   against the replica.
/// - **503 Service Unavailable**: The replica or the primary is unreachable.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "reader": { "status": "ok", "message": "Replica reachable" },
///     "writer": { "status": "ok", "message": "Primary reachable" },
///     "cache":  { "status": "ok", "message": "redis reachable" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let (reader, writer, cache) = tokio::join!(
        check_reader(&state),
        check_writer(&state),
        check_cache(&state)
    );

    let stores_ok = reader.is_ok() && writer.is_ok();
    let status = match (stores_ok, cache.is_ok()) {
        (true, true) => "healthy",
        (true, false) => "degraded",
        (false, _) => "unhealthy",
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            reader,
            writer,
            cache,
        },
    };

    if stores_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_reader(state: &AppState) -> CheckStatus {
    match state.accessor.reader().ping_replica().await {
        Ok(()) => CheckStatus::ok("Replica reachable"),
        Err(e) => CheckStatus::error(format!("Replica error: {}", e)),
    }
}

async fn check_writer(state: &AppState) -> CheckStatus {
    match state.accessor.writer().ping_primary().await {
        Ok(()) => CheckStatus::ok("Primary reachable"),
        Err(e) => CheckStatus::error(format!("Primary error: {}", e)),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    let cache = state.accessor.cache();
    if cache.health_check().await {
        CheckStatus::ok(format!("{} reachable", cache.backend()))
    } else {
        CheckStatus::error(format!("{} unreachable", cache.backend()))
    }
}
