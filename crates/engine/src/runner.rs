//! Run orchestration: recovery sweep, claim, dispatch, timeout guard.
//!
//! One run drains at most one claimed batch. Entries are dispatched in small
//! concurrent sub-batches; a per-entry failure becomes a FAILED/DEAD
//! transition and never aborts the rest of the batch, while store errors
//! abort the run and propagate to the trigger caller.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::PgPool;
use tokio::task::JoinSet;
use uuid::Uuid;

use outpost_common::config::OutboxConfig;
use outpost_common::error::AppError;
use outpost_common::transport::Transports;
use outpost_common::types::{EntryStatus, OutboxEntry, RunSummary};

use crate::claim::ClaimScheduler;
use crate::dispatch::{ChannelDispatcher, DispatchOutcome};
use crate::recovery::RecoverySweep;
use crate::transition::{TransitionEngine, log_transition, reason};

/// Wall-clock budget for one run. Invocations are expected to come from a
/// periodic external scheduler; the budget keeps a slow batch from leaving
/// entries stranded in `PROCESSING` past the invocation ceiling.
struct RunDeadline {
    started: Instant,
    budget: Duration,
}

impl RunDeadline {
    fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    fn exceeded(&self) -> bool {
        self.started.elapsed() >= self.budget
    }
}

/// Executes outbox runs end to end.
pub struct OutboxRunner {
    pool: PgPool,
    config: OutboxConfig,
    dispatcher: Arc<ChannelDispatcher>,
}

enum EntryOutcome {
    Sent,
    Failed,
    Dead,
}

impl OutboxRunner {
    pub fn new(pool: PgPool, config: OutboxConfig, transports: Transports) -> Self {
        Self {
            pool,
            config,
            dispatcher: Arc::new(ChannelDispatcher::new(transports)),
        }
    }

    /// Execute one run: sweep stale claims, lease a batch, dispatch it under
    /// the run budget. Returns aggregate counts for the trigger caller.
    pub async fn run(&self) -> Result<RunSummary, AppError> {
        let deadline = RunDeadline::new(self.config.run_budget);

        let recovered = RecoverySweep::release_stale(&self.pool, &self.config).await?;
        let claimed = ClaimScheduler::claim_due(&self.pool, &self.config).await?;

        tracing::info!(
            recovered = recovered.len(),
            claimed = claimed.len(),
            "Outbox run started"
        );

        let mut summary = RunSummary::default();
        let mut queue: VecDeque<OutboxEntry> = claimed.into();

        while !queue.is_empty() {
            if deadline.exceeded() {
                let ids: Vec<Uuid> = queue.iter().map(|entry| entry.id).collect();
                let released = self.release_unprocessed(&ids).await?;
                summary.failed += released as u64;
                tracing::warn!(
                    released,
                    "Run budget exceeded, released remaining claimed entries"
                );
                break;
            }

            let take = queue.len().min(self.config.dispatch_concurrency);
            let mut tasks = JoinSet::new();
            for entry in queue.drain(..take) {
                let pool = self.pool.clone();
                let config = self.config.clone();
                let dispatcher = self.dispatcher.clone();
                tasks.spawn(async move {
                    Self::process_entry(&pool, &config, &dispatcher, entry).await
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let outcome = joined
                    .map_err(|e| AppError::Internal(format!("dispatch task failed: {}", e)))??;
                match outcome {
                    EntryOutcome::Sent => summary.sent += 1,
                    EntryOutcome::Failed => summary.failed += 1,
                    EntryOutcome::Dead => summary.dead += 1,
                }
            }
        }

        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            dead = summary.dead,
            "Outbox run finished"
        );

        Ok(summary)
    }

    /// Dispatch one claimed entry and persist its resulting transition.
    ///
    /// Transport errors and rejections are normalized into the failure path;
    /// only store errors bubble out of here.
    async fn process_entry(
        pool: &PgPool,
        config: &OutboxConfig,
        dispatcher: &ChannelDispatcher,
        entry: OutboxEntry,
    ) -> Result<EntryOutcome, AppError> {
        let failure = match dispatcher.dispatch(&entry).await {
            Ok(DispatchOutcome::Delivered) => {
                TransitionEngine::record_success(pool, &entry).await?;
                return Ok(EntryOutcome::Sent);
            }
            Ok(DispatchOutcome::Rejected(why)) => why,
            Err(err) => err.to_string(),
        };

        let status = TransitionEngine::record_failure(pool, config, &entry, &failure).await?;
        Ok(match status {
            EntryStatus::Dead => EntryOutcome::Dead,
            _ => EntryOutcome::Failed,
        })
    }

    /// Release claimed-but-undispatched entries back to `FAILED` after the
    /// run budget is exhausted. The `AND status = 'processing'` guard makes
    /// the release idempotent against entries a sub-batch already finished.
    async fn release_unprocessed(&self, ids: &[Uuid]) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;

        let released: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE outbox_entries
            SET status = $2, next_retry_at = now(), updated_at = now()
            WHERE id = ANY($1) AND status = $3
            RETURNING id
            "#,
        )
        .bind(ids)
        .bind(EntryStatus::Failed)
        .bind(EntryStatus::Processing)
        .fetch_all(&mut *tx)
        .await?;

        for id in &released {
            log_transition(
                &mut tx,
                *id,
                EntryStatus::Processing,
                EntryStatus::Failed,
                reason::RUN_TIMEOUT_RELEASE,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(released.len())
    }
}
