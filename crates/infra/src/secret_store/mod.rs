//! Versioned secret store boundary.
//!
//! The remote allowlist strategy reads the latest version of a named secret
//! through [`SecretStore`] without assuming which backend serves it.

pub mod in_memory;
pub mod secret_manager;
pub mod r#trait;

pub use in_memory::InMemorySecretStore;
pub use secret_manager::{AccessTokenSource, SecretManagerClient, SecretManagerConfig};
pub use r#trait::{SecretStore, SecretStoreError, SecretVersion};
