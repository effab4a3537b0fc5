//! Infrastructure layer: secret store adapters and the remote allowlist strategy.

pub mod remote_source;
pub mod secret_store;

pub use remote_source::{CachedAllowlist, RemoteAllowlistSource, RemoteSourceOptions};
pub use secret_store::{
    AccessTokenSource, InMemorySecretStore, SecretManagerClient, SecretManagerConfig,
    SecretStore, SecretStoreError, SecretVersion,
};
