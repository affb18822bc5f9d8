//! Config schema: all sections with serde defaults.

use serde::{Deserialize, Serialize};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnyaConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
    pub retry: RetryConfig,
    pub credentials: CredentialsConfig,
}

/// HTTP front door settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed to call `/api/*` from a browser. Empty list means
    /// no CORS headers are ever emitted.
    pub cors_origins: Vec<String>,
    /// Verbose per-call logging of inbound/outbound chat text.
    /// Also settable via the `DEBUG_MODE` environment variable.
    pub debug_mode: bool,
    /// Reply sent to users when the upstream provider fails.
    pub fallback_reply: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            cors_origins: Vec::new(),
            debug_mode: false,
            fallback_reply: "Oh, I got a little distracted... Shall we try that again?".into(),
        }
    }
}

/// GigaChat upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// OAuth token issuance endpoint.
    pub oauth_url: String,
    /// Chat completion endpoint.
    pub api_url: String,
    /// OAuth scope to request.
    pub scope: String,
    /// Base64 authorization key issued by the GigaChat portal. Prefer the
    /// `GIGACHAT_AUTH_KEY` environment variable over putting it in a file.
    pub auth_key: String,
    /// Model name to request.
    pub model: String,
    /// Persona prompt prepended to every completion call.
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate per reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Whole-request timeout for completion and token calls, in seconds.
    pub request_timeout_secs: u64,
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            oauth_url: "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".into(),
            api_url: "https://gigachat.devices.sberbank.ru/api/v1/chat/completions".into(),
            scope: "GIGACHAT_API_PERS".into(),
            auth_key: String::new(),
            model: "GigaChat".into(),
            system_prompt: None,
            max_tokens: 1024,
            temperature: 0.7,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Per-user conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum retained turns per user; oldest turns are dropped first.
    pub max_turns: usize,
    /// Sessions idle longer than this are evicted, in seconds.
    pub idle_ttl_secs: u64,
    /// How often the eviction sweep runs, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 40,
            idle_ttl_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

/// Retry/backoff policy for transient upstream failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total completion attempts per call, including the first.
    pub max_attempts: u32,
    /// Backoff base delay, in milliseconds. Doubles per attempt.
    pub base_delay_ms: u64,
    /// Backoff delay ceiling, in milliseconds.
    pub max_delay_ms: u64,
    /// Upper bound of the uniform jitter added to each delay, in milliseconds.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4000,
            jitter_ms: 250,
        }
    }
}

/// Access credential lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// A credential within this margin of its expiry is treated as expired
    /// and refreshed ahead of use, in seconds.
    pub safety_margin_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            safety_margin_secs: 60,
        }
    }
}
