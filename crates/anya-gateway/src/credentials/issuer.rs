//! Token issuance against the GigaChat OAuth endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::CredentialError;

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Source of new access tokens. The production implementation is
/// `OauthIssuer`; tests substitute their own.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self) -> Result<IssuedToken, CredentialError>;
}

/// Client-credentials OAuth flow: the portal-issued base64 auth key is
/// exchanged for a short-lived bearer token.
pub struct OauthIssuer {
    auth_key: String,
    oauth_url: String,
    scope: String,
    http: reqwest::Client,
}

impl fmt::Debug for OauthIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OauthIssuer")
            .field("auth_key", &"[REDACTED]")
            .field("oauth_url", &self.oauth_url)
            .field("scope", &self.scope)
            .finish()
    }
}

impl OauthIssuer {
    pub fn new(
        auth_key: impl Into<String>,
        oauth_url: impl Into<String>,
        scope: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            auth_key: auth_key.into(),
            oauth_url: oauth_url.into(),
            scope: scope.into(),
            http: reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .timeout(request_timeout)
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

/// Wire shape of the token endpoint response. `expires_at` is unix
/// milliseconds.
#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_at: i64,
}

#[async_trait]
impl TokenIssuer for OauthIssuer {
    async fn issue(&self) -> Result<IssuedToken, CredentialError> {
        // Each issuance request must carry a unique request id.
        let rq_uid = uuid::Uuid::new_v4().to_string();

        let response = self
            .http
            .post(&self.oauth_url)
            .header("Authorization", format!("Basic {}", self.auth_key))
            .header("RqUID", rq_uid)
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await
            .map_err(|e| CredentialError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(CredentialError::Endpoint(format!("HTTP {status}: {text}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::Parse(e.to_string()))?;

        let expires_at = DateTime::from_timestamp_millis(token.expires_at).ok_or_else(|| {
            CredentialError::Parse(format!("invalid expires_at: {}", token.expires_at))
        })?;

        debug!(%expires_at, "issued new access token");
        Ok(IssuedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}
