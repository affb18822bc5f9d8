//! Short-lived access credential lifecycle for the GigaChat API.

mod issuer;
mod manager;

pub use issuer::{IssuedToken, OauthIssuer, TokenIssuer};
pub use manager::CredentialManager;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A bearer credential for the upstream provider. Replaced whole on
/// refresh, never partially updated.
#[derive(Clone)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// A credential is usable only while it is at least `safety_margin`
    /// away from expiry.
    pub fn is_valid(&self, safety_margin: Duration) -> bool {
        let margin = chrono::Duration::milliseconds(safety_margin.as_millis() as i64);
        Utc::now() < self.expires_at - margin
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token issuance failures.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("token endpoint rejected the request: {0}")]
    Endpoint(String),
    #[error("token endpoint network error: {0}")]
    Network(String),
    #[error("token response parse error: {0}")]
    Parse(String),
}
