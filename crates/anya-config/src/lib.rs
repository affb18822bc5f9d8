//! Anya gateway configuration system.
//!
//! Provides TOML-based configuration with environment overrides and
//! validation. All config sections use sensible defaults so partial
//! configs work out of the box; the only value with no usable default
//! is the GigaChat auth key, which is normally supplied via the
//! `GIGACHAT_AUTH_KEY` environment variable.

pub mod errors;
pub mod loader;
pub mod schema;
pub mod validation;

pub use errors::ConfigError;
pub use schema::AnyaConfig;

/// Convenience function to load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, applies environment overrides, and validates the
/// result (validation failures are logged as warnings, not fatal).
pub fn load_config() -> Result<AnyaConfig, ConfigError> {
    loader::load_default()
}
