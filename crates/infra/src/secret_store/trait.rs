use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use allowgate_core::GateError;

/// One resolved version of a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersion {
    /// Fully-qualified version name as reported by the store
    /// (e.g. `projects/p/secrets/auth-allowed-emails/versions/7`).
    pub name: String,

    /// Decoded UTF-8 payload.
    pub payload: String,
}

/// Secret store operation error.
///
/// `NotFound` and `InvalidPayload` mean nothing usable is configured; every
/// other variant means the source of truth could not be consulted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretStoreError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("not authorized to access secret: {0}")]
    Unauthorized(String),

    #[error("secret store transport failure: {0}")]
    Transport(String),

    #[error("malformed secret store response: {0}")]
    Malformed(String),

    /// The store answered, but the secret's bytes are not a usable allowlist.
    #[error("invalid secret payload: {0}")]
    InvalidPayload(String),
}

impl From<SecretStoreError> for GateError {
    fn from(value: SecretStoreError) -> Self {
        match value {
            SecretStoreError::NotFound(_) | SecretStoreError::InvalidPayload(_) => {
                GateError::configuration(value.to_string())
            }
            SecretStoreError::Unauthorized(_)
            | SecretStoreError::Transport(_)
            | SecretStoreError::Malformed(_) => GateError::upstream(value.to_string()),
        }
    }
}

/// Read access to the latest version of a named secret.
///
/// Implementations may suspend on network IO; callers bound them with a timeout.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn access_latest(&self, secret: &str) -> Result<SecretVersion, SecretStoreError>;
}

#[async_trait]
impl<S> SecretStore for Arc<S>
where
    S: SecretStore + ?Sized,
{
    async fn access_latest(&self, secret: &str) -> Result<SecretVersion, SecretStoreError> {
        (**self).access_latest(secret).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_payloads_mean_configuration_everything_else_upstream() {
        let gate: GateError = SecretStoreError::NotFound("auth-allowed-emails".into()).into();
        assert!(matches!(gate, GateError::Configuration(_)));
        let gate: GateError = SecretStoreError::InvalidPayload("not UTF-8".into()).into();
        assert!(matches!(gate, GateError::Configuration(_)));

        for err in [
            SecretStoreError::Unauthorized("403".into()),
            SecretStoreError::Transport("connection reset".into()),
            SecretStoreError::Malformed("bad base64".into()),
        ] {
            let gate: GateError = err.into();
            assert!(matches!(gate, GateError::Upstream(_)));
        }
    }
}
