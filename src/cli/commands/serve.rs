use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::ratelimit::FastStore;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting back-office API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_none() {
        tracing::error!("JWT_SECRET is not set; every authenticated request will fail");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    let fast_store = if config.fast_store.url.is_some() {
        Arc::new(FastStore::from_config(&config.fast_store))
    } else {
        tracing::warn!("REDIS_URL is not set; rate limiting is disabled");
        Arc::new(FastStore::absent())
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState::new(config, pool, fast_store));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Back-office API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
