//! Channel transport seams.
//!
//! The engine only ever talks to external delivery services through these
//! traits; concrete HTTP clients live in `outpost-notifier` and tests plug in
//! in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::PushMessage;

/// Outbound email sender.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError>;
}

/// Fire-a-webhook primitive.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn fire(&self, url: &str, payload: &serde_json::Value) -> Result<(), AppError>;
}

/// Chat-bot alert sender. Returns whether the bot API accepted the message.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, bot_token: &str, chat_id: &str, message: &str) -> Result<bool, AppError>;
}

/// Browser push sender.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, user_id: &str, message: &PushMessage) -> Result<(), AppError>;
}

/// Bundle of channel transports handed to the dispatcher.
#[derive(Clone)]
pub struct Transports {
    pub mailer: Arc<dyn Mailer>,
    pub webhooks: Arc<dyn WebhookSender>,
    pub chat: Arc<dyn ChatSender>,
    pub push: Arc<dyn PushSender>,
}
