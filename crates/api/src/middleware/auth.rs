//! Trigger authentication.
//!
//! The delivery trigger is meant to be called by a scheduling platform, not
//! end users: a shared-secret bearer token compared in constant time, plus an
//! optional platform header the scheduler stamps on its requests. Rejection
//! happens before any store access.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use outpost_common::error::AppError;

use crate::state::AppState;

/// Proof that the request came from the configured scheduler.
///
/// Use as an Axum extractor on trigger routes:
/// ```ignore
/// async fn handler(_auth: TriggerAuth) -> impl IntoResponse {
///     // only reached with a valid shared secret
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TriggerAuth;

/// Constant-time comparison of the presented token against the configured
/// secret. Length differences short-circuit, which leaks only the length.
fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

impl FromRequestParts<AppState> for TriggerAuth {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = state.config.trigger_secret.clone();

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let platform_header_present = state
            .config
            .trigger_header
            .as_deref()
            .map(|name| parts.headers.contains_key(name));

        async move {
            if platform_header_present == Some(false) {
                return Err(AppError::Auth(
                    "Missing platform trigger header".to_string(),
                ));
            }

            let token = auth_header
                .as_deref()
                .and_then(|auth| auth.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    AppError::Auth("Missing or invalid Authorization header".to_string())
                })?;

            if !secrets_match(token, &secret) {
                return Err(AppError::Auth("Invalid trigger secret".to_string()));
            }

            Ok(TriggerAuth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secrets_accepted() {
        assert!(secrets_match("cron-secret", "cron-secret"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        assert!(!secrets_match("cron-secret", "cron-secreT"));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(!secrets_match("cron", "cron-secret"));
        assert!(!secrets_match("", "cron-secret"));
    }
}
