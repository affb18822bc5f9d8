//! Conversation orchestrator: the single entry point tying together the
//! session store, credential manager, and completion client.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::credentials::CredentialManager;
use crate::store::SessionStore;
use crate::{CompletionClient, CompletionError, GatewayError, Turn};

/// Probe message used by `health`; never touches real session state.
const HEALTH_PROBE_MESSAGE: &str = "ping";
const HEALTH_PREVIEW_CHARS: usize = 50;

/// Bounded retry with jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total completion attempts per call, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(4000),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many attempts have
    /// already failed (1-based).
    pub(crate) fn delay_for(&self, failed_attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempts.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Truncated reply preview when healthy, error description otherwise.
    pub detail: String,
}

/// Façade over the gateway: `handle` one user message end to end,
/// `reset` a conversation, `health`-probe the upstream.
///
/// Collaborators are injected at construction; there is no ambient
/// global state.
pub struct Orchestrator {
    store: Arc<SessionStore>,
    credentials: Arc<CredentialManager>,
    client: Arc<dyn CompletionClient>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        credentials: Arc<CredentialManager>,
        client: Arc<dyn CompletionClient>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            credentials,
            client,
            retry,
        }
    }

    /// Process one user message: load history, call the upstream with
    /// full context, append the exchange, return the reply.
    ///
    /// Auth failures trigger exactly one credential refresh and retry;
    /// transient failures and rate limits are retried up to
    /// `retry.max_attempts` total attempts with backoff. History is only
    /// touched on success.
    pub async fn handle(&self, user_id: &str, message: &str) -> Result<String, GatewayError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(GatewayError::Validation("message must not be empty".into()));
        }

        let user_turn = Turn::user(message);
        let mut context = self.store.history(user_id).await;
        context.push(user_turn.clone());

        let mut credential = self
            .credentials
            .get()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

        let mut failed_attempts: u32 = 0;
        let mut auth_retried = false;
        loop {
            match self.client.complete(&context, &credential).await {
                Ok(reply) => {
                    self.store
                        .append_exchange(user_id, user_turn.clone(), Turn::assistant(&reply))
                        .await;
                    return Ok(reply);
                }
                Err(CompletionError::Auth) => {
                    if auth_retried {
                        return Err(GatewayError::UpstreamUnavailable(
                            "credential rejected twice".into(),
                        ));
                    }
                    auth_retried = true;
                    warn!(user_id = %user_id, "credential rejected, forcing refresh");
                    credential = self
                        .credentials
                        .force_refresh()
                        .await
                        .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;
                }
                Err(CompletionError::Permanent(msg)) => {
                    return Err(GatewayError::RequestRejected(msg));
                }
                Err(CompletionError::RateLimited { retry_after }) => {
                    failed_attempts += 1;
                    if failed_attempts >= self.retry.max_attempts {
                        return Err(GatewayError::UpstreamUnavailable(format!(
                            "rate limited after {failed_attempts} attempts"
                        )));
                    }
                    let mut delay = self.retry.delay_for(failed_attempts);
                    if let Some(hint) = retry_after {
                        delay = delay.max(hint);
                    }
                    debug!(user_id = %user_id, ?delay, "rate limited, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(CompletionError::Transient(msg)) => {
                    failed_attempts += 1;
                    if failed_attempts >= self.retry.max_attempts {
                        return Err(GatewayError::UpstreamUnavailable(msg));
                    }
                    let delay = self.retry.delay_for(failed_attempts);
                    debug!(
                        user_id = %user_id,
                        error = %msg,
                        attempt = failed_attempts,
                        ?delay,
                        "transient upstream error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Drop a user's conversation history. Returns whether one existed.
    pub async fn reset(&self, user_id: &str) -> bool {
        let existed = self.store.reset(user_id).await;
        if existed {
            debug!(user_id = %user_id, "conversation history reset");
        }
        existed
    }

    /// Probe upstream connectivity with a fixed synthetic message. Does
    /// not mutate any session state and performs a single attempt.
    pub async fn health(&self) -> HealthStatus {
        let probe = [Turn::user(HEALTH_PROBE_MESSAGE)];

        let credential = match self.credentials.get().await {
            Ok(credential) => credential,
            Err(e) => {
                return HealthStatus {
                    healthy: false,
                    detail: e.to_string(),
                }
            }
        };

        match self.client.complete(&probe, &credential).await {
            Ok(reply) => HealthStatus {
                healthy: true,
                detail: preview(&reply),
            },
            Err(e) => HealthStatus {
                healthy: false,
                detail: e.to_string(),
            },
        }
    }
}

fn preview(reply: &str) -> String {
    if reply.chars().count() <= HEALTH_PREVIEW_CHARS {
        return reply.to_string();
    }
    let mut p: String = reply.chars().take(HEALTH_PREVIEW_CHARS).collect();
    p.push_str("...");
    p
}
