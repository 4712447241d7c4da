//! Browser push via an external relay service.
//!
//! The relay owns the Web Push subscriptions keyed by user id; this client
//! only posts the message envelope.

use async_trait::async_trait;

use outpost_common::error::AppError;
use outpost_common::transport::PushSender;
use outpost_common::types::PushMessage;

pub struct PushRelayClient {
    client: reqwest::Client,
    relay_url: Option<String>,
}

impl PushRelayClient {
    pub fn new(client: reqwest::Client, relay_url: Option<String>) -> Self {
        Self { client, relay_url }
    }
}

#[async_trait]
impl PushSender for PushRelayClient {
    async fn send(&self, user_id: &str, message: &PushMessage) -> Result<(), AppError> {
        let relay_url = self
            .relay_url
            .as_deref()
            .ok_or_else(|| AppError::Config("PUSH_RELAY_URL is not configured".to_string()))?;

        let response = self
            .client
            .post(relay_url)
            .json(&serde_json::json!({
                "user_id": user_id,
                "title": message.title,
                "body": message.body,
                "url": message.url,
                "tag": message.tag,
            }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("push relay request failed: {}", e)))?;

        response
            .error_for_status()
            .map_err(|e| AppError::Transport(format!("push relay returned error status: {}", e)))?;

        tracing::debug!(user_id, "Push message relayed");
        Ok(())
    }
}
