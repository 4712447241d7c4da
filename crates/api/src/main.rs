//! Outpost API server binary entrypoint.

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use outpost_common::config::AppConfig;
use outpost_common::db::create_pool;

use outpost_api::routes::create_router;
use outpost_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("outpost_api=debug,outpost_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Outpost API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool and apply migrations
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database pool created");

    // Wire channel transports
    let transports = outpost_notifier::build_transports(&config);

    // Build application state
    let state = AppState::new(pool, config, transports);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
