use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::r#trait::{SecretStore, SecretStoreError, SecretVersion};

/// In-memory versioned secret store.
///
/// Intended for tests/dev. Supports injected failures and latency so callers
/// can exercise timeout and fallback paths.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, Vec<String>>>,
    failure: RwLock<Option<SecretStoreError>>,
    latency: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every access by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(Some(latency));
        self
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self
            .latency
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = latency;
    }

    /// Append a new version; it becomes `latest`.
    pub fn put(&self, secret: &str, payload: impl Into<String>) {
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        secrets
            .entry(secret.to_string())
            .or_default()
            .push(payload.into());
    }

    /// Fail every subsequent access with `err` until [`recover`](Self::recover).
    pub fn fail_with(&self, err: SecretStoreError) {
        *self
            .failure
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(err);
    }

    pub fn recover(&self) {
        *self
            .failure
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Number of `access_latest` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn access_latest(&self, secret: &str) -> Result<SecretVersion, SecretStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self
            .latency
            .read()
            .map_err(|_| SecretStoreError::Transport("lock poisoned".to_string()))?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .failure
            .read()
            .map_err(|_| SecretStoreError::Transport("lock poisoned".to_string()))?
            .clone();
        if let Some(err) = failure {
            return Err(err);
        }

        let secrets = self
            .secrets
            .read()
            .map_err(|_| SecretStoreError::Transport("lock poisoned".to_string()))?;

        let versions = secrets
            .get(secret)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretStoreError::NotFound(secret.to_string()))?;

        let latest = versions.len();
        Ok(SecretVersion {
            name: format!("secrets/{secret}/versions/{latest}"),
            payload: versions[latest - 1].clone(),
        })
    }
}
