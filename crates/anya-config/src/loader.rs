//! TOML config loading: read from path or platform default, then apply
//! environment overrides.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::schema::AnyaConfig;
use crate::validation;

/// Environment variables recognized as overrides. Secrets belong here
/// rather than in the config file.
const ENV_AUTH_KEY: &str = "GIGACHAT_AUTH_KEY";
const ENV_OAUTH_URL: &str = "GIGACHAT_OAUTH_URL";
const ENV_API_URL: &str = "GIGACHAT_API_URL";
const ENV_SCOPE: &str = "GIGACHAT_SCOPE";
const ENV_DEBUG_MODE: &str = "DEBUG_MODE";

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields,
/// then applies environment overrides. After loading, the config is
/// validated; if validation fails, a warning is logged and the parsed
/// config is returned as-is.
pub fn load_from_path(path: &Path) -> Result<AnyaConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let mut config: AnyaConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e} — using parsed config with potentially invalid values");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/anya/config.toml`
/// On Linux: `~/.config/anya/config.toml`
///
/// If the file does not exist, creates a default config file and returns
/// defaults (with environment overrides applied).
pub fn load_default() -> Result<AnyaConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::ParseError(msg)) if msg.contains("failed to read") => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            let mut config = AnyaConfig::default();
            apply_env_overrides(&mut config);
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("anya").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// Overlay recognized environment variables onto a parsed config.
pub fn apply_env_overrides(config: &mut AnyaConfig) {
    if let Ok(key) = std::env::var(ENV_AUTH_KEY) {
        config.upstream.auth_key = key;
    }
    if let Ok(url) = std::env::var(ENV_OAUTH_URL) {
        config.upstream.oauth_url = url;
    }
    if let Ok(url) = std::env::var(ENV_API_URL) {
        config.upstream.api_url = url;
    }
    if let Ok(scope) = std::env::var(ENV_SCOPE) {
        config.upstream.scope = scope;
    }
    if let Ok(value) = std::env::var(ENV_DEBUG_MODE) {
        config.server.debug_mode = value.eq_ignore_ascii_case("true");
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"# Anya gateway configuration.
# Any omitted value falls back to its built-in default.

[server]
host = "0.0.0.0"
port = 5000
# Browser origins allowed to call /api/*.
cors_origins = []
debug_mode = false
fallback_reply = "Oh, I got a little distracted... Shall we try that again?"

[upstream]
oauth_url = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth"
api_url = "https://gigachat.devices.sberbank.ru/api/v1/chat/completions"
scope = "GIGACHAT_API_PERS"
# Prefer the GIGACHAT_AUTH_KEY environment variable for the auth key.
auth_key = ""
model = "GigaChat"
max_tokens = 1024
temperature = 0.7
request_timeout_secs = 60
connect_timeout_secs = 10

[session]
max_turns = 40
idle_ttl_secs = 1800
sweep_interval_secs = 60

[retry]
max_attempts = 3
base_delay_ms = 250
max_delay_ms = 4000
jitter_ms = 250

[credentials]
safety_margin_secs = 60
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_nonexistent_returns_parse_error() {
        let result = load_from_path(Path::new("/tmp/nonexistent_anya_config.toml"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn load_valid_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9000

[upstream]
model = "GigaChat-Pro"
"#,
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.upstream.model, "GigaChat-Pro");
        // Defaults preserved
        assert_eq!(config.session.max_turns, 40);
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = load_from_path(&path);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn default_template_parses_to_defaults() {
        let config: AnyaConfig = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.credentials.safety_margin_secs, 60);
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var(ENV_AUTH_KEY, "test-key-from-env");
        std::env::set_var(ENV_DEBUG_MODE, "True");

        let mut config = AnyaConfig::default();
        apply_env_overrides(&mut config);
        assert_eq!(config.upstream.auth_key, "test-key-from-env");
        assert!(config.server.debug_mode);

        std::env::remove_var(ENV_AUTH_KEY);
        std::env::remove_var(ENV_DEBUG_MODE);
    }
}
