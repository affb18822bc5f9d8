//! Conversational session gateway for the Anya chat service.
//!
//! Mediates between many concurrent users and the GigaChat completion
//! API with:
//! - Per-user multi-turn conversation state with bounded history
//! - Short-lived OAuth credential lifecycle with single-flight refresh
//! - Classified upstream errors and bounded retry with backoff
//! - A single orchestrator façade (`handle` / `reset` / `health`)

pub mod credentials;
pub mod gigachat;
pub mod orchestrator;
pub mod store;

use std::time::Duration;

use async_trait::async_trait;

pub use credentials::{
    Credential, CredentialError, CredentialManager, IssuedToken, OauthIssuer, TokenIssuer,
};
pub use gigachat::{GigaChatClient, GigaChatConfig};
pub use orchestrator::{HealthStatus, Orchestrator, RetryPolicy};
pub use store::SessionStore;

/// A chat-completion backend. One network attempt per call; retry policy
/// belongs to the orchestrator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        context: &[Turn],
        credential: &Credential,
    ) -> Result<String, CompletionError>;
}

/// One message in a conversation, immutable once appended.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Classified outcome of a single completion attempt.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("credential rejected by upstream")]
    Auth,
    #[error("rate limited by upstream")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transient upstream error: {0}")]
    Transient(String),
    #[error("permanent upstream rejection: {0}")]
    Permanent(String),
}

/// Errors that cross the orchestrator boundary. Everything else is
/// handled or retried internally.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("request rejected by upstream: {0}")]
    RequestRejected(String),
}
