//! Recipe API auth service - Main Application Entry Point
//!
//! REST API server for accounts, session tokens and API keys.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Passwords**: Argon2id with per-user salt
//! - **Sessions**: HMAC-SHA256 signed bearer tokens
//! - **API keys**: stored as SHA-256 digests, plaintext shown once
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build application state, router and rate-limit eviction task
//! 5. Start server on configured port

use std::{net::SocketAddr, sync::Arc};

use recipe_api_auth::{
    AppState, AuthSettings, config::Config, db, router, store::PgCredentialStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store = Arc::new(PgCredentialStore::new(pool));
    let state = AppState::new(store, AuthSettings::from(&config))?;

    state
        .limiter
        .clone()
        .spawn_eviction_task(config.rate_limit_eviction_interval());

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses feed the per-client rate-limit key
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
