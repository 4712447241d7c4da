//! Telegram bot alerts via the Bot API `sendMessage` method.

use async_trait::async_trait;
use serde::Deserialize;

use outpost_common::error::AppError;
use outpost_common::transport::ChatSender;

pub struct TelegramClient {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send(&self, bot_token: &str, chat_id: &str, message: &str) -> Result<bool, AppError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", bot_token);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": message,
            }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("telegram request failed: {}", e)))?;

        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("telegram response unreadable: {}", e)))?;

        if !body.ok {
            tracing::warn!(
                chat_id,
                description = body.description.as_deref().unwrap_or("none"),
                "Telegram rejected message"
            );
        }

        Ok(body.ok)
    }
}
