//! Transition engine — the single choke point for status changes.
//!
//! Every status write after the initial claim goes through
//! [`TransitionEngine::transition`], which persists the change and appends
//! the paired audit record inside one database transaction. If the write
//! fails, no audit record is emitted and the error propagates.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use outpost_common::config::OutboxConfig;
use outpost_common::error::AppError;
use outpost_common::types::{EntryStatus, OutboxEntry};

/// Transition reasons recorded in the audit log.
pub mod reason {
    pub const CLAIMED: &str = "claimed";
    pub const DELIVERY_SUCCESS: &str = "delivery_success";
    pub const DELIVERY_FAILURE: &str = "delivery_failure";
    pub const MAX_ATTEMPTS_EXCEEDED: &str = "max_attempts_exceeded";
    pub const CRASH_RECOVERY_STUCK: &str = "crash_recovery_stuck";
    pub const RUN_TIMEOUT_RELEASE: &str = "run_timeout_release";
}

/// Extra fields persisted together with a status change. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub attempts: Option<i32>,
    pub last_error: Option<String>,
    pub next_retry_at: Option<chrono::DateTime<Utc>>,
}

/// Persists status changes and their audit records.
pub struct TransitionEngine;

impl TransitionEngine {
    /// Move an entry from `from` to `to`, merging `fields` into the same
    /// write, and append the audit record.
    ///
    /// The update is guarded on the expected `from` status; a mismatch (entry
    /// missing, already terminal, or concurrently moved) is a conflict and
    /// nothing is written.
    pub async fn transition(
        pool: &PgPool,
        entry_id: Uuid,
        from: EntryStatus,
        to: EntryStatus,
        reason: &str,
        fields: TransitionFields,
    ) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE outbox_entries
            SET status = $3,
                attempts = COALESCE($4, attempts),
                last_error = COALESCE($5, last_error),
                next_retry_at = COALESCE($6, next_retry_at),
                updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(entry_id)
        .bind(from)
        .bind(to)
        .bind(fields.attempts)
        .bind(&fields.last_error)
        .bind(fields.next_retry_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Entry {} is not in state {}",
                entry_id, from
            )));
        }

        log_transition(&mut tx, entry_id, from, to, reason).await?;
        tx.commit().await?;

        tracing::info!(
            entry_id = %entry_id,
            from = %from,
            to = %to,
            reason,
            "Entry transitioned"
        );

        Ok(())
    }

    /// Record a successful dispatch: `PROCESSING -> SENT`, attempts bumped.
    pub async fn record_success(pool: &PgPool, entry: &OutboxEntry) -> Result<(), AppError> {
        Self::transition(
            pool,
            entry.id,
            EntryStatus::Processing,
            EntryStatus::Sent,
            reason::DELIVERY_SUCCESS,
            TransitionFields {
                attempts: Some(entry.attempts + 1),
                ..Default::default()
            },
        )
        .await
    }

    /// Record a failed dispatch: attempts bumped, exponential backoff
    /// scheduled, and the entry moved to `FAILED` — or `DEAD` once the
    /// attempt ceiling is reached. Returns the resulting status.
    pub async fn record_failure(
        pool: &PgPool,
        config: &OutboxConfig,
        entry: &OutboxEntry,
        error: &str,
    ) -> Result<EntryStatus, AppError> {
        let new_attempts = entry.attempts + 1;
        let delay = backoff_delay(config.retry_base_ms, new_attempts.max(0) as u32);
        let next_retry_at = Utc::now() + delay;

        let (to, why) = if new_attempts >= entry.max_attempts {
            (EntryStatus::Dead, reason::MAX_ATTEMPTS_EXCEEDED)
        } else {
            (EntryStatus::Failed, reason::DELIVERY_FAILURE)
        };

        Self::transition(
            pool,
            entry.id,
            EntryStatus::Processing,
            to,
            why,
            TransitionFields {
                attempts: Some(new_attempts),
                last_error: Some(error.to_string()),
                next_retry_at: Some(next_retry_at),
            },
        )
        .await?;

        Ok(to)
    }
}

/// Append one audit record inside the caller's transaction.
///
/// Also used by the claim scheduler and recovery sweep, whose status writes
/// are batch updates rather than per-entry transitions.
pub async fn log_transition(
    conn: &mut PgConnection,
    entry_id: Uuid,
    from: EntryStatus,
    to: EntryStatus,
    reason: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO outbox_transitions (id, entry_id, from_status, to_status, reason, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry_id)
    .bind(from)
    .bind(to)
    .bind(reason)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Retry delay after the Nth attempt: `base * 2^attempts`, saturating.
pub fn backoff_delay(base_ms: u64, attempts: u32) -> chrono::Duration {
    let factor = 1_u64.checked_shl(attempts).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor).min(i64::MAX as u64);
    chrono::Duration::milliseconds(delay_ms as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        // 1st failure -> ~60s, 2nd -> ~120s, 3rd -> ~240s
        assert_eq!(backoff_delay(30_000, 1).num_milliseconds(), 60_000);
        assert_eq!(backoff_delay(30_000, 2).num_milliseconds(), 120_000);
        assert_eq!(backoff_delay(30_000, 3).num_milliseconds(), 240_000);
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let delay = backoff_delay(30_000, 200);
        assert_eq!(delay.num_milliseconds(), i64::MAX);
    }
}
