use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an outbox entry.
///
/// `Sent` and `Dead` are terminal; the transition engine refuses to move an
/// entry out of either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Dead,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Processing => write!(f, "processing"),
            EntryStatus::Sent => write!(f, "sent"),
            EntryStatus::Failed => write!(f, "failed"),
            EntryStatus::Dead => write!(f, "dead"),
        }
    }
}

/// Delivery channel an entry is routed through.
///
/// Entries store the channel as raw text; parsing happens at dispatch so an
/// unrecognized value follows the normal retry/dead-letter path instead of
/// failing row decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Webhook,
    Telegram,
    BrowserPush,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Webhook => write!(f, "webhook"),
            Channel::Telegram => write!(f, "telegram"),
            Channel::BrowserPush => write!(f, "browser_push"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "webhook" => Ok(Channel::Webhook),
            "telegram" => Ok(Channel::Telegram),
            "browser_push" => Ok(Channel::BrowserPush),
            other => Err(format!("unknown channel '{}'", other)),
        }
    }
}

/// A queued notification — the unit of work drained by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub channel: String,
    pub destination: String,
    pub subject: String,
    pub payload: serde_json::Value,
    pub status: EntryStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub next_retry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit record paired with every status change.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransitionRecord {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub from_status: EntryStatus,
    pub to_status: EntryStatus,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts reported to the trigger caller after a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub sent: u64,
    pub failed: u64,
    pub dead: u64,
}

/// Browser-push message shape handed to the push sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_round_trip() {
        for channel in [
            Channel::Email,
            Channel::Webhook,
            Channel::Telegram,
            Channel::BrowserPush,
        ] {
            let parsed: Channel = channel.to_string().parse().unwrap();
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn test_unknown_channel_rejected() {
        assert!("carrier_pigeon".parse::<Channel>().is_err());
        assert!("EMAIL".parse::<Channel>().is_err());
    }

    #[test]
    fn test_status_display_matches_storage() {
        assert_eq!(EntryStatus::Pending.to_string(), "pending");
        assert_eq!(EntryStatus::Processing.to_string(), "processing");
        assert_eq!(EntryStatus::Sent.to_string(), "sent");
        assert_eq!(EntryStatus::Failed.to_string(), "failed");
        assert_eq!(EntryStatus::Dead.to_string(), "dead");
    }
}
