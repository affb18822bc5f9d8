//! CompletionClient trait implementation for GigaChatClient.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::{CompletionClient, CompletionError, Credential, Turn};

use super::client::GigaChatClient;

#[async_trait]
impl CompletionClient for GigaChatClient {
    async fn complete(
        &self,
        context: &[Turn],
        credential: &Credential,
    ) -> Result<String, CompletionError> {
        let body = self.build_request_body(context);

        debug!(model = %self.config.model, turns = context.len(), "GigaChat completion request");

        let response = self
            .http
            .post(&self.config.api_url)
            .header(
                "Authorization",
                format!("Bearer {}", credential.access_token),
            )
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CompletionError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(classify_http_failure(status, &text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Transient(e.to_string()))?;

        self.parse_response(json)
    }
}

/// Map a non-429 HTTP failure status onto the error taxonomy: rejected
/// credentials, retryable server trouble, or a permanent rejection.
pub(crate) fn classify_http_failure(status: StatusCode, body: &str) -> CompletionError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return CompletionError::Auth;
    }
    if status.is_server_error() {
        return CompletionError::Transient(format!("HTTP {status}: {body}"));
    }
    CompletionError::Permanent(format!("HTTP {status}: {body}"))
}
