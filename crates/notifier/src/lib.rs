//! Concrete channel transports.
//!
//! HTTP clients behind the `outpost-common` transport traits:
//! - Email via the Resend HTTP API
//! - Raw webhook POSTs
//! - Telegram bot messages
//! - Browser push via a configured relay endpoint

pub mod email;
pub mod push;
pub mod telegram;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use outpost_common::config::AppConfig;
use outpost_common::transport::Transports;

/// Per-request timeout applied to every transport call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        // Builder only fails on TLS backend misconfiguration; fall back to
        // the default client rather than poisoning startup.
        .unwrap_or_default()
}

/// Wire the full transport bundle from application config.
///
/// Unconfigured transports stay in the bundle and fail at dispatch time;
/// configuration-incomplete entries retry and dead-letter like any other
/// failure instead of being dropped.
pub fn build_transports(config: &AppConfig) -> Transports {
    let client = http_client();

    Transports {
        mailer: Arc::new(email::ResendMailer::new(
            client.clone(),
            config.resend_api_key.clone(),
            config.email_from.clone(),
        )),
        webhooks: Arc::new(webhook::WebhookClient::new(client.clone())),
        chat: Arc::new(telegram::TelegramClient::new(client.clone())),
        push: Arc::new(push::PushRelayClient::new(
            client,
            config.push_relay_url.clone(),
        )),
    }
}
