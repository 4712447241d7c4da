//! Channel dispatcher — routes a claimed entry to its transport.
//!
//! One branch per channel; every non-success is normalized into a single
//! failure path by the runner. An unrecognized channel value is never
//! silently dropped: it is rejected, retried, and eventually dead-lettered
//! like any transport failure, so the defect surfaces in the DEAD count.

use outpost_common::error::AppError;
use outpost_common::transport::Transports;
use outpost_common::types::{Channel, OutboxEntry, PushMessage};

/// Result of one dispatch attempt that did not error at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// The entry could not be handed to a transport (unknown channel,
    /// incomplete payload, bot rejection). Counts as a delivery failure.
    Rejected(String),
}

pub struct ChannelDispatcher {
    transports: Transports,
}

impl ChannelDispatcher {
    pub fn new(transports: Transports) -> Self {
        Self { transports }
    }

    /// Dispatch one claimed entry to its channel transport.
    pub async fn dispatch(&self, entry: &OutboxEntry) -> Result<DispatchOutcome, AppError> {
        let channel = match entry.channel.parse::<Channel>() {
            Ok(channel) => channel,
            Err(_) => {
                tracing::warn!(
                    entry_id = %entry.id,
                    channel = %entry.channel,
                    "Unknown channel, entry will be retried"
                );
                return Ok(DispatchOutcome::Rejected(format!(
                    "unknown channel '{}'",
                    entry.channel
                )));
            }
        };

        match channel {
            Channel::Email => {
                let html = entry
                    .payload
                    .get("html")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                self.transports
                    .mailer
                    .send(&entry.destination, &entry.subject, html)
                    .await?;
                Ok(DispatchOutcome::Delivered)
            }

            Channel::Webhook => {
                self.transports
                    .webhooks
                    .fire(&entry.destination, &entry.payload)
                    .await?;
                Ok(DispatchOutcome::Delivered)
            }

            Channel::Telegram => {
                let bot_token = entry.payload.get("botToken").and_then(|v| v.as_str());
                let message = entry.payload.get("message").and_then(|v| v.as_str());

                match (bot_token, message) {
                    (Some(token), Some(text)) => {
                        let accepted = self
                            .transports
                            .chat
                            .send(token, &entry.destination, text)
                            .await?;
                        if accepted {
                            Ok(DispatchOutcome::Delivered)
                        } else {
                            Ok(DispatchOutcome::Rejected(
                                "chat bot rejected message".to_string(),
                            ))
                        }
                    }
                    // Configuration-incomplete, not a transport failure, but
                    // handled identically: it counts toward attempts.
                    _ => {
                        tracing::warn!(
                            entry_id = %entry.id,
                            "Telegram payload missing botToken or message"
                        );
                        Ok(DispatchOutcome::Rejected(
                            "telegram payload missing botToken or message".to_string(),
                        ))
                    }
                }
            }

            Channel::BrowserPush => {
                let message = PushMessage {
                    title: entry
                        .payload
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&entry.subject)
                        .to_string(),
                    body: entry
                        .payload
                        .get("body")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    url: entry
                        .payload
                        .get("url")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    tag: entry
                        .payload
                        .get("tag")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                };
                self.transports.push.send(&entry.destination, &message).await?;
                Ok(DispatchOutcome::Delivered)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use outpost_common::transport::{ChatSender, Mailer, PushSender, WebhookSender};
    use outpost_common::types::EntryStatus;

    use super::*;

    #[derive(Default)]
    struct FakeMailer {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<(), AppError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingWebhook;

    #[async_trait]
    impl WebhookSender for FailingWebhook {
        async fn fire(&self, _url: &str, _payload: &serde_json::Value) -> Result<(), AppError> {
            Err(AppError::Transport("connection refused".to_string()))
        }
    }

    struct FakeChat {
        accept: bool,
    }

    #[async_trait]
    impl ChatSender for FakeChat {
        async fn send(
            &self,
            _bot_token: &str,
            _chat_id: &str,
            _message: &str,
        ) -> Result<bool, AppError> {
            Ok(self.accept)
        }
    }

    struct FakePush;

    #[async_trait]
    impl PushSender for FakePush {
        async fn send(&self, _user_id: &str, _message: &PushMessage) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn make_dispatcher(mailer: Arc<FakeMailer>, chat_accept: bool) -> ChannelDispatcher {
        ChannelDispatcher::new(Transports {
            mailer,
            webhooks: Arc::new(FailingWebhook),
            chat: Arc::new(FakeChat {
                accept: chat_accept,
            }),
            push: Arc::new(FakePush),
        })
    }

    fn make_entry(channel: &str, payload: serde_json::Value) -> OutboxEntry {
        OutboxEntry {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            destination: "dest".to_string(),
            subject: "subject".to_string(),
            payload,
            status: EntryStatus::Processing,
            attempts: 0,
            max_attempts: 5,
            last_error: None,
            next_retry_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_email_dispatch_delivers() {
        let mailer = Arc::new(FakeMailer::default());
        let dispatcher = make_dispatcher(mailer.clone(), true);
        let entry = make_entry("email", serde_json::json!({"html": "<p>hi</p>"}));

        let outcome = dispatcher.dispatch(&entry).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webhook_transport_error_propagates() {
        let dispatcher = make_dispatcher(Arc::new(FakeMailer::default()), true);
        let entry = make_entry("webhook", serde_json::json!({"event": "ping"}));

        let result = dispatcher.dispatch(&entry).await;
        assert!(matches!(result, Err(AppError::Transport(_))));
    }

    #[tokio::test]
    async fn test_telegram_missing_bot_token_rejected() {
        let dispatcher = make_dispatcher(Arc::new(FakeMailer::default()), true);
        let entry = make_entry("telegram", serde_json::json!({"message": "alert"}));

        let outcome = dispatcher.dispatch(&entry).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_telegram_bot_rejection_is_failure() {
        let dispatcher = make_dispatcher(Arc::new(FakeMailer::default()), false);
        let entry = make_entry(
            "telegram",
            serde_json::json!({"botToken": "t", "message": "alert"}),
        );

        let outcome = dispatcher.dispatch(&entry).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_browser_push_falls_back_to_subject_title() {
        let dispatcher = make_dispatcher(Arc::new(FakeMailer::default()), true);
        let entry = make_entry("browser_push", serde_json::json!({"body": "hello"}));

        let outcome = dispatcher.dispatch(&entry).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_unknown_channel_rejected_not_dropped() {
        let dispatcher = make_dispatcher(Arc::new(FakeMailer::default()), true);
        let entry = make_entry("carrier_pigeon", serde_json::json!({}));

        let outcome = dispatcher.dispatch(&entry).await.unwrap();
        match outcome {
            DispatchOutcome::Rejected(reason) => assert!(reason.contains("carrier_pigeon")),
            DispatchOutcome::Delivered => unreachable!("unknown channel must not deliver"),
        }
    }
}
