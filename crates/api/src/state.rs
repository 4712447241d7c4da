//! Shared application state for the Axum API server.

use outpost_common::config::AppConfig;
use outpost_common::transport::Transports;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub transports: Transports,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, transports: Transports) -> Self {
        Self {
            pool,
            config,
            transports,
        }
    }
}
