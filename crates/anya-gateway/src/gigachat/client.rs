//! GigaChat client struct, request building, and response parsing.

use crate::{CompletionError, Role, Turn};

use super::config::GigaChatConfig;

/// GigaChat API client.
pub struct GigaChatClient {
    pub(crate) config: GigaChatConfig,
    pub(crate) http: reqwest::Client,
}

impl GigaChatClient {
    pub fn new(config: GigaChatConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { config, http }
    }

    /// Build the JSON request body for the chat completions API. The
    /// configured system prompt, if any, leads the messages array.
    pub(crate) fn build_request_body(&self, context: &[Turn]) -> serde_json::Value {
        let mut msgs = Vec::new();
        if let Some(ref system) = self.config.system_prompt {
            msgs.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }
        for turn in context {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            msgs.push(serde_json::json!({
                "role": role,
                "content": turn.content,
            }));
        }

        serde_json::json!({
            "model": self.config.model,
            "messages": msgs,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        })
    }

    /// Extract the assistant's reply text from a completion response.
    pub(crate) fn parse_response(&self, json: serde_json::Value) -> Result<String, CompletionError> {
        json["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(String::from)
            .ok_or_else(|| {
                CompletionError::Transient(
                    "completion response missing choices[0].message.content".into(),
                )
            })
    }
}
