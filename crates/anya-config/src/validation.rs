//! Config validation: numeric ranges and obviously broken values.
//!
//! Collects all problems into a single `ConfigError` so a user sees
//! everything wrong with their file at once.

use crate::errors::ConfigError;
use crate::schema::AnyaConfig;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &AnyaConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_upstream(&mut errors, config);
    validate_session(&mut errors, config);
    validate_retry(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &AnyaConfig) {
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    if config
        .server
        .cors_origins
        .iter()
        .any(|origin| origin.trim().is_empty())
    {
        errors.push("server.cors_origins must not contain empty entries".into());
    }
}

fn validate_upstream(errors: &mut Vec<String>, config: &AnyaConfig) {
    for (name, url) in [
        ("upstream.oauth_url", &config.upstream.oauth_url),
        ("upstream.api_url", &config.upstream.api_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(format!("{name} must be an http(s) URL, got '{url}'"));
        }
    }
    if !(0.0..=2.0).contains(&config.upstream.temperature) {
        errors.push(format!(
            "upstream.temperature must be in 0.0..=2.0, got {}",
            config.upstream.temperature
        ));
    }
    if config.upstream.max_tokens == 0 {
        errors.push("upstream.max_tokens must be at least 1".into());
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push("upstream.request_timeout_secs must be at least 1".into());
    }
}

fn validate_session(errors: &mut Vec<String>, config: &AnyaConfig) {
    if config.session.max_turns < 2 {
        errors.push("session.max_turns must be at least 2 (one exchange)".into());
    }
    if config.session.sweep_interval_secs == 0 {
        errors.push("session.sweep_interval_secs must be at least 1".into());
    }
}

fn validate_retry(errors: &mut Vec<String>, config: &AnyaConfig) {
    if config.retry.max_attempts == 0 {
        errors.push("retry.max_attempts must be at least 1".into());
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(format!(
            "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
            config.retry.base_delay_ms, config.retry.max_delay_ms
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&AnyaConfig::default()).is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AnyaConfig::default();
        config.retry.max_attempts = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("retry.max_attempts"));
    }

    #[test]
    fn tiny_history_rejected() {
        let mut config = AnyaConfig::default();
        config.session.max_turns = 1;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("session.max_turns"));
    }

    #[test]
    fn bad_url_rejected() {
        let mut config = AnyaConfig::default();
        config.upstream.api_url = "gigachat.devices.sberbank.ru".into();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("upstream.api_url"));
    }

    #[test]
    fn errors_are_collected() {
        let mut config = AnyaConfig::default();
        config.retry.max_attempts = 0;
        config.upstream.max_tokens = 0;
        config.upstream.temperature = 5.0;
        let err = validate(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("retry.max_attempts"));
        assert!(msg.contains("upstream.max_tokens"));
        assert!(msg.contains("upstream.temperature"));
    }
}
