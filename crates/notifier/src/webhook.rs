//! Raw webhook delivery: POST the payload as JSON to the destination URL.

use async_trait::async_trait;

use outpost_common::error::AppError;
use outpost_common::transport::WebhookSender;

pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookSender for WebhookClient {
    async fn fire(&self, url: &str, payload: &serde_json::Value) -> Result<(), AppError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("webhook request failed: {}", e)))?;

        // 4xx/5xx are transient channel failures; the engine retries them.
        response
            .error_for_status()
            .map_err(|e| AppError::Transport(format!("webhook returned error status: {}", e)))?;

        tracing::debug!(url, "Webhook fired");
        Ok(())
    }
}
