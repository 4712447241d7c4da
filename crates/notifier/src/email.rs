//! Email delivery via the Resend HTTP API.

use async_trait::async_trait;

use outpost_common::error::AppError;
use outpost_common::transport::Mailer;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from: Option<String>,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, api_key: Option<String>, from: Option<String>) -> Self {
        Self {
            client,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("RESEND_API_KEY is not configured".to_string()))?;
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| AppError::Config("EMAIL_FROM is not configured".to_string()))?;

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "from": from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("resend request failed: {}", e)))?;

        response
            .error_for_status()
            .map_err(|e| AppError::Transport(format!("resend rejected email: {}", e)))?;

        tracing::debug!(to, "Email handed to Resend");
        Ok(())
    }
}
