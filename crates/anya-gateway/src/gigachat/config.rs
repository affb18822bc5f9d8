//! GigaChat completion client configuration.

use std::time::Duration;

/// Completion endpoint configuration. Credentials are handled separately
/// by the credential manager; nothing here is secret.
#[derive(Debug, Clone)]
pub struct GigaChatConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Persona prompt prepended to every completion call.
    pub system_prompt: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            api_url: "https://gigachat.devices.sberbank.ru/api/v1/chat/completions".to_string(),
            model: "GigaChat".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            system_prompt: None,
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl GigaChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}
