//! Service wiring and HTTP server lifecycle.

use crate::application::services::UserAccessor;
use crate::config::Config;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{PgUserRepository, connect_pool};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;

/// Builds the Cache Store adapter.
///
/// An unreachable Redis at startup is not fatal: the service runs uncached.
pub async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_key_prefix.clone()).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

/// Connects both Record Store endpoints and the cache, and assembles the accessor.
///
/// Migrations are applied through the primary.
///
/// # Errors
///
/// Returns an error if either endpoint is unreachable or migrations fail.
pub async fn build_accessor(config: &Config) -> Result<UserAccessor> {
    let writer_pool = connect_pool(&config.writer_database_url, &config.pool)
        .await
        .context("Failed to connect to the primary")?;
    tracing::info!("Connected to primary");

    sqlx::migrate!("./migrations")
        .run(&writer_pool)
        .await
        .context("Failed to migrate")?;

    let reader_pool = if config.is_single_endpoint() {
        writer_pool.clone()
    } else {
        connect_pool(&config.reader_database_url, &config.pool)
            .await
            .context("Failed to connect to the replica")?
    };
    tracing::info!("Connected to replica");

    let cache = build_cache(config).await;

    Ok(UserAccessor::new(
        Arc::new(PgUserRepository::new(Arc::new(reader_pool))),
        Arc::new(PgUserRepository::new(Arc::new(writer_pool))),
        cache,
        config.accessor_config(),
    ))
}

/// Runs the HTTP server with the given configuration until Ctrl-C / SIGTERM.
///
/// # Errors
///
/// Returns an error if:
/// - A store connection fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let accessor = build_accessor(&config).await?;
    let state = AppState::new(Arc::new(accessor));

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
