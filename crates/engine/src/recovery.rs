//! Recovery sweep — reclaims entries abandoned mid-delivery.
//!
//! Runs before claiming new work. An entry still `PROCESSING` with an
//! `updated_at` older than the staleness threshold belonged to a worker that
//! died (or a run that was killed); it is moved back to `FAILED` so the next
//! claim can pick it up.

use sqlx::PgPool;
use uuid::Uuid;

use outpost_common::config::OutboxConfig;
use outpost_common::error::AppError;
use outpost_common::types::EntryStatus;

use crate::transition::{log_transition, reason};

pub struct RecoverySweep;

impl RecoverySweep {
    /// Release all stale `PROCESSING` entries in one atomic update.
    ///
    /// A single `UPDATE ... RETURNING` keeps the sweep from racing a worker
    /// that is legitimately still processing: only rows older than the
    /// threshold at update time are touched. Attempts are not incremented —
    /// no delivery outcome is known for an abandoned entry. Zero matches is
    /// a no-op.
    pub async fn release_stale(
        pool: &PgPool,
        config: &OutboxConfig,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut tx = pool.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE outbox_entries
            SET status = $2, next_retry_at = now(), updated_at = now()
            WHERE status = $3
              AND updated_at < now() - make_interval(secs => $1)
            RETURNING id
            "#,
        )
        .bind(config.stale_after.as_secs_f64())
        .bind(EntryStatus::Failed)
        .bind(EntryStatus::Processing)
        .fetch_all(&mut *tx)
        .await?;

        for id in &ids {
            log_transition(
                &mut tx,
                *id,
                EntryStatus::Processing,
                EntryStatus::Failed,
                reason::CRASH_RECOVERY_STUCK,
            )
            .await?;
        }

        tx.commit().await?;

        if !ids.is_empty() {
            tracing::warn!(recovered = ids.len(), "Released stale processing entries");
        }

        Ok(ids)
    }
}
