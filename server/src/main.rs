//! Accounts session HTTP server.
//!
//! OAuth login, refresh token rotation and logout over PostgreSQL.

mod config;

use accounts_auth::providers::{HttpOAuthClient, SystemClock};
use accounts_auth::stores::PostgresAccountStore;
use accounts_auth::{api_router, SessionConfig, SessionEnvironment, SessionService, TokenSigner};
use anyhow::Context;
use config::Config;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "accounts_server=info,accounts_auth=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting accounts server");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(?config, "Configuration loaded");

    // Setup database
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PostgresAccountStore::new(pool.clone());
    store.migrate().await.context("Failed to run migrations")?;
    info!("Database ready");

    // Setup session service
    let oauth = HttpOAuthClient::new(
        config.oauth.api_gateway.clone(),
        config.oauth.client_id.clone(),
        config.oauth.client_secret.clone(),
    )
    .with_timeout(config.oauth_timeout());

    let session_config = SessionConfig::new(config.oauth.redirect_uri.clone())
        .with_upstream_timeout(config.oauth_timeout());
    let signer = TokenSigner::new(
        config.token.signing_secret.as_bytes(),
        chrono::Duration::seconds(config.token.access_token_ttl_secs),
    );

    let service = SessionService::new(
        SessionEnvironment::new(store, oauth, SystemClock),
        signer,
        session_config,
    );

    // Build router
    let app = api_router(Arc::new(service))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(address = %config.server.bind_addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight requests are drained; give the pool a bounded time to close.
    if tokio::time::timeout(config.shutdown_timeout(), pool.close())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = config.server.shutdown_timeout,
            "Database pool did not close before shutdown timeout"
        );
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
