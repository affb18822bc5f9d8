//! Credential manager with single-flight refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{Credential, CredentialError, TokenIssuer};

/// Owns the process-wide credential and its refresh lifecycle.
///
/// All callers that observe a missing or near-expiry credential coalesce
/// on one token-endpoint call: the refresh mutex admits one fetcher, and
/// everyone queued behind it re-checks the stored credential before
/// fetching again.
pub struct CredentialManager {
    issuer: Arc<dyn TokenIssuer>,
    current: RwLock<Option<Credential>>,
    refresh: Mutex<()>,
    /// Bumped on every replacement; lets `force_refresh` callers detect
    /// that someone else already replaced the credential they saw fail.
    generation: AtomicU64,
    safety_margin: Duration,
}

impl CredentialManager {
    pub fn new(issuer: Arc<dyn TokenIssuer>, safety_margin: Duration) -> Self {
        Self {
            issuer,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
            safety_margin,
        }
    }

    /// Return a currently valid credential, refreshing if missing or
    /// inside the safety margin of expiry.
    pub async fn get(&self) -> Result<Credential, CredentialError> {
        if let Some(credential) = self.current_valid().await {
            return Ok(credential);
        }

        let _guard = self.refresh.lock().await;
        // Someone else may have refreshed while we waited for the lock.
        if let Some(credential) = self.current_valid().await {
            return Ok(credential);
        }
        self.fetch_and_replace().await
    }

    /// Replace the credential unconditionally, after upstream rejected
    /// it. A burst of concurrent callers still produces one fetch.
    pub async fn force_refresh(&self) -> Result<Credential, CredentialError> {
        let seen = self.generation.load(Ordering::Acquire);

        let _guard = self.refresh.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            // A concurrent refresh already replaced the rejected
            // credential; adopt its result instead of fetching again.
            if let Some(credential) = self.current.read().await.clone() {
                return Ok(credential);
            }
        }
        self.fetch_and_replace().await
    }

    async fn current_valid(&self) -> Option<Credential> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|credential| credential.is_valid(self.safety_margin))
            .cloned()
    }

    /// Must be called with the refresh lock held.
    async fn fetch_and_replace(&self) -> Result<Credential, CredentialError> {
        match self.issuer.issue().await {
            Ok(token) => {
                let credential = Credential {
                    access_token: token.access_token,
                    expires_at: token.expires_at,
                };
                *self.current.write().await = Some(credential.clone());
                self.generation.fetch_add(1, Ordering::AcqRel);
                debug!(expires_at = %credential.expires_at, "credential replaced");
                Ok(credential)
            }
            Err(e) => {
                // The previous credential stays in place; it may still be
                // inside its margin.
                warn!(error = %e, "token refresh failed, keeping previous credential");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;

    use chrono::Utc;

    use super::*;
    use crate::credentials::IssuedToken;

    /// Issuer that counts calls and can be told to fail or hand out
    /// already-expired tokens.
    struct FakeIssuer {
        calls: AtomicUsize,
        fail: AtomicBool,
        ttl_secs: i64,
        delay: Duration,
    }

    impl FakeIssuer {
        fn new(ttl_secs: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                ttl_secs,
                delay: Duration::from_millis(100),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TokenIssuer for FakeIssuer {
        async fn issue(&self) -> Result<IssuedToken, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            // Hold the refresh lock long enough for every racer to queue up.
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(CredentialError::Network("connection refused".into()));
            }
            Ok(IssuedToken {
                access_token: format!("token-{n}"),
                expires_at: Utc::now() + chrono::Duration::seconds(self.ttl_secs),
            })
        }
    }

    fn manager(issuer: &Arc<FakeIssuer>) -> Arc<CredentialManager> {
        Arc::new(CredentialManager::new(
            Arc::clone(issuer) as Arc<dyn TokenIssuer>,
            Duration::from_secs(10),
        ))
    }

    #[tokio::test]
    async fn get_reuses_valid_credential() {
        let issuer = Arc::new(FakeIssuer::new(3600));
        let manager = manager(&issuer);

        let first = manager.get().await.unwrap();
        let second = manager.get().await.unwrap();
        assert_eq!(first.access_token, second.access_token);
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test]
    async fn get_refreshes_inside_safety_margin() {
        // Tokens live 5s, margin is 10s: every get sees an expired token.
        let issuer = Arc::new(FakeIssuer::new(5));
        let manager = manager(&issuer);

        manager.get().await.unwrap();
        manager.get().await.unwrap();
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_getters_coalesce_into_one_fetch() {
        let issuer = Arc::new(FakeIssuer::new(3600));
        let manager = manager(&issuer);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.get().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_force_refreshes_coalesce_into_one_fetch() {
        let issuer = Arc::new(FakeIssuer::new(3600));
        let manager = manager(&issuer);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.force_refresh().await }));
        }
        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap().access_token);
        }
        assert_eq!(issuer.calls(), 1);
        // Every caller adopted the same replacement.
        assert!(tokens.iter().all(|t| t == &tokens[0]));
    }

    #[tokio::test]
    async fn serial_force_refreshes_fetch_each_time() {
        let issuer = Arc::new(FakeIssuer::new(3600));
        let manager = manager(&issuer);

        let first = manager.force_refresh().await.unwrap();
        let second = manager.force_refresh().await.unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_credential() {
        let issuer = Arc::new(FakeIssuer::new(3600));
        let manager = manager(&issuer);

        let original = manager.get().await.unwrap();
        issuer.fail.store(true, Ordering::SeqCst);

        assert!(manager.force_refresh().await.is_err());
        // The still-valid credential survives the failed refresh.
        let kept = manager.get().await.unwrap();
        assert_eq!(kept.access_token, original.access_token);
    }
}
