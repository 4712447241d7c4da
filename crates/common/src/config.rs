use std::time::Duration;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Shared secret required by the delivery trigger endpoint
    pub trigger_secret: String,

    /// Optional header name that the scheduling platform stamps on trigger
    /// requests; when set, requests missing the header are rejected
    pub trigger_header: Option<String>,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// Browser-push relay endpoint
    pub push_relay_url: Option<String>,

    /// Maximum entries claimed per run (default: 50)
    pub outbox_batch_size: i64,

    /// Wall-clock budget per run in milliseconds (default: 55000,
    /// chosen to stay under a typical serverless invocation ceiling)
    pub outbox_run_budget_ms: u64,

    /// Age in seconds after which a processing entry is presumed abandoned
    /// (default: 600)
    pub outbox_stale_after_secs: u64,

    /// Base retry backoff in milliseconds (default: 30000)
    pub outbox_retry_base_ms: u64,

    /// Entries dispatched concurrently within a run (default: 10)
    pub outbox_dispatch_concurrency: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            trigger_secret: std::env::var("TRIGGER_SECRET")
                .map_err(|_| anyhow::anyhow!("TRIGGER_SECRET environment variable is required"))?,
            trigger_header: std::env::var("TRIGGER_HEADER").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            push_relay_url: std::env::var("PUSH_RELAY_URL").ok(),
            outbox_batch_size: std::env::var("OUTBOX_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OUTBOX_BATCH_SIZE must be a valid i64"))?,
            outbox_run_budget_ms: std::env::var("OUTBOX_RUN_BUDGET_MS")
                .unwrap_or_else(|_| "55000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OUTBOX_RUN_BUDGET_MS must be a valid u64"))?,
            outbox_stale_after_secs: std::env::var("OUTBOX_STALE_AFTER_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OUTBOX_STALE_AFTER_SECS must be a valid u64"))?,
            outbox_retry_base_ms: std::env::var("OUTBOX_RETRY_BASE_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OUTBOX_RETRY_BASE_MS must be a valid u64"))?,
            outbox_dispatch_concurrency: std::env::var("OUTBOX_DISPATCH_CONCURRENCY")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OUTBOX_DISPATCH_CONCURRENCY must be a valid usize"))?,
        })
    }

    /// Engine tuning knobs derived from the application config.
    pub fn outbox(&self) -> OutboxConfig {
        OutboxConfig {
            batch_size: self.outbox_batch_size,
            run_budget: Duration::from_millis(self.outbox_run_budget_ms),
            stale_after: Duration::from_secs(self.outbox_stale_after_secs),
            retry_base_ms: self.outbox_retry_base_ms,
            dispatch_concurrency: self.outbox_dispatch_concurrency.max(1),
        }
    }
}

/// Tuning knobs for the outbox engine, passed in at construction rather than
/// read from globals.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Maximum entries claimed per run
    pub batch_size: i64,
    /// Wall-clock budget for one run
    pub run_budget: Duration,
    /// Age after which a processing entry is presumed abandoned
    pub stale_after: Duration,
    /// Base retry backoff in milliseconds
    pub retry_base_ms: u64,
    /// Entries dispatched concurrently within a run
    pub dispatch_concurrency: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            run_budget: Duration::from_secs(55),
            stale_after: Duration::from_secs(600),
            retry_base_ms: 30_000,
            dispatch_concurrency: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_config_defaults() {
        let cfg = OutboxConfig::default();
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.run_budget, Duration::from_secs(55));
        assert_eq!(cfg.stale_after, Duration::from_secs(600));
        assert_eq!(cfg.retry_base_ms, 30_000);
        assert_eq!(cfg.dispatch_concurrency, 10);
    }
}
