//! # Server Module
//!
//! HTTP server setup and route configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::get,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER, TokenGate};
use crate::auth::TokenIssuer;
use crate::config::{Config, StorageConfig};
use crate::database::{self, DatabaseConfig, DatabaseConnection, MemoryUserStore, UserStore};
use crate::routes;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub users: Arc<dyn UserStore>,
}

/// Which optional routes to mount.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// `/api/auth/debug/users`
    pub debug_routes: bool,
    /// `/api/test-db`
    pub database_check: bool,
}

/// Build the full application router.
pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let protected_routes = Router::new()
        .route("/api/protected-route", get(routes::protected::protected_route))
        .layer(middleware::from_fn_with_state(
            state.issuer.clone(),
            TokenGate::require_auth,
        ));

    let mut app = Router::new()
        .route("/", get(routes::health::root))
        .route("/api/health", get(routes::health::health))
        .merge(routes::auth::create_auth_routes(options.debug_routes))
        .merge(protected_routes);

    if options.database_check {
        app = app.route("/api/test-db", get(routes::health::test_db));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer()),
    )
    .with_state(state)
}

/// Browser clients must be allowed to send the refresh token and to read
/// the rotated pair off the response.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            REFRESH_TOKEN_HEADER,
            header::ACCEPT,
        ])
        .expose_headers([ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER])
}

/// Open the configured user store, running migrations for PostgreSQL.
async fn open_user_store(storage: &StorageConfig) -> Result<Arc<dyn UserStore>> {
    match storage {
        StorageConfig::Memory => Ok(Arc::new(MemoryUserStore::new())),
        StorageConfig::Postgres {
            url,
            max_connections,
        } => {
            let db_config = DatabaseConfig::from_url(url, *max_connections)?;
            let db = DatabaseConnection::new(db_config)
                .await
                .context("Failed to connect to DB")?;
            database::migrations::run_migrations(db.pool()).await?;
            Ok(Arc::new(db))
        }
    }
}

/// Starts the HTTP server and runs until a shutdown signal arrives.
pub async fn start(config: Config) -> Result<()> {
    let issuer = Arc::new(TokenIssuer::new(&config.jwt_secret)?);
    let users = open_user_store(&config.storage).await?;

    let options = RouterOptions {
        debug_routes: !config.environment.is_production(),
        database_check: matches!(config.storage, StorageConfig::Postgres { .. }),
    };
    let app = build_router(AppState { issuer, users }, options);

    let addr = config.server.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("Storage: {}", config.storage.kind());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
