//! Outbox trigger and operator routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use outpost_common::error::AppError;
use outpost_common::types::{EntryStatus, RunSummary};
use outpost_engine::runner::OutboxRunner;

use crate::middleware::auth::TriggerAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/outbox/run", post(run_outbox))
        .route("/api/outbox/status", get(outbox_status))
}

/// POST /api/outbox/run — Execute one delivery run.
///
/// Called by the external scheduler (e.g. every 60 seconds). Overlapping
/// invocations are safe: the claim scheduler partitions work between them.
async fn run_outbox(
    State(state): State<AppState>,
    _auth: TriggerAuth,
) -> Result<Json<RunSummary>, AppError> {
    let runner = OutboxRunner::new(
        state.pool.clone(),
        state.config.outbox(),
        state.transports.clone(),
    );
    let summary = runner.run().await?;
    Ok(Json(summary))
}

/// GET /api/outbox/status — Entry counts by status for operator inspection.
///
/// Dead-lettered entries are never deleted by the engine, so the `dead`
/// count here is the operator's backlog.
async fn outbox_status(
    State(state): State<AppState>,
    _auth: TriggerAuth,
) -> Result<Json<serde_json::Value>, AppError> {
    let counts: Vec<(EntryStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM outbox_entries GROUP BY status")
            .fetch_all(&state.pool)
            .await?;

    let mut by_status = serde_json::Map::new();
    for status in [
        EntryStatus::Pending,
        EntryStatus::Processing,
        EntryStatus::Sent,
        EntryStatus::Failed,
        EntryStatus::Dead,
    ] {
        let count = counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        by_status.insert(status.to_string(), serde_json::json!(count));
    }

    Ok(Json(serde_json::Value::Object(by_status)))
}
