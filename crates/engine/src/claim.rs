//! Claim scheduler — atomic select-and-lease of due entries.
//!
//! The sole path through which an entry leaves `PENDING`/`FAILED` for
//! `PROCESSING`. Locking with `FOR UPDATE SKIP LOCKED` guarantees that
//! overlapping runs always claim disjoint sets.

use sqlx::PgPool;
use uuid::Uuid;

use outpost_common::config::OutboxConfig;
use outpost_common::error::AppError;
use outpost_common::types::{EntryStatus, OutboxEntry};

use crate::transition::{log_transition, reason};

/// Service that leases batches of eligible entries for one run.
pub struct ClaimScheduler;

impl ClaimScheduler {
    /// Atomically claim up to `batch_size` due entries, oldest-due first.
    ///
    /// Eligible entries are `PENDING` or `FAILED`, past `next_retry_at`, and
    /// below their attempt ceiling. The select, the move to `PROCESSING`, and
    /// the `claimed` audit records commit as one transaction. Returns an
    /// empty batch when nothing is due.
    pub async fn claim_due(
        pool: &PgPool,
        config: &OutboxConfig,
    ) -> Result<Vec<OutboxEntry>, AppError> {
        let mut tx = pool.begin().await?;

        // Rows already locked by a concurrent run are skipped, not awaited.
        let due: Vec<(Uuid, EntryStatus)> = sqlx::query_as(
            r#"
            SELECT id, status FROM outbox_entries
            WHERE status IN ('pending', 'failed')
              AND next_retry_at <= now()
              AND attempts < max_attempts
            ORDER BY next_retry_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(config.batch_size)
        .fetch_all(&mut *tx)
        .await?;

        if due.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = due.iter().map(|(id, _)| *id).collect();

        let entries: Vec<OutboxEntry> = sqlx::query_as(
            r#"
            UPDATE outbox_entries
            SET status = $2, updated_at = now()
            WHERE id = ANY($1)
            RETURNING *
            "#,
        )
        .bind(&ids)
        .bind(EntryStatus::Processing)
        .fetch_all(&mut *tx)
        .await?;

        for (id, from) in &due {
            log_transition(&mut tx, *id, *from, EntryStatus::Processing, reason::CLAIMED).await?;
        }

        tx.commit().await?;

        tracing::debug!(claimed = entries.len(), "Claimed due entries");
        Ok(entries)
    }
}
