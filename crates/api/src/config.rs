//! Startup configuration.
//!
//! Read once from a key lookup (the process environment in production, a map
//! in tests) and turned into an injected [`AllowlistSource`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use allowgate_auth::{AllowlistSource, LocalAllowlistSource};
use allowgate_core::{ALLOWED_EMAILS_SECRET, ALLOWED_EMAILS_SETTING};
use allowgate_infra::secret_store::secret_manager::DEFAULT_ENDPOINT;
use allowgate_infra::{
    AccessTokenSource, RemoteAllowlistSource, RemoteSourceOptions, SecretManagerClient,
    SecretManagerConfig, SecretStoreError,
};

pub const STRATEGY_KEY: &str = "AUTH_ALLOWLIST_SOURCE";
pub const SECRET_KEY: &str = "AUTH_ALLOWLIST_SECRET";
pub const CACHE_TTL_KEY: &str = "AUTH_ALLOWLIST_CACHE_TTL_SECS";
pub const FETCH_TIMEOUT_KEY: &str = "AUTH_ALLOWLIST_FETCH_TIMEOUT_MS";
pub const ENDPOINT_KEY: &str = "SECRET_MANAGER_ENDPOINT";
pub const ACCESS_TOKEN_KEY: &str = "SECRET_MANAGER_ACCESS_TOKEN";
pub const BIND_ADDR_KEY: &str = "BIND_ADDR";
pub const PROJECT_KEYS: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown allowlist strategy '{0}' (expected 'local' or 'remote')")]
    UnknownStrategy(String),

    #[error("remote allowlist strategy requires GOOGLE_CLOUD_PROJECT or GCLOUD_PROJECT")]
    MissingProject,

    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("BIND_ADDR is not a socket address: '{0}'")]
    InvalidBindAddr(String),
}

/// Settings for the remote strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub project_id: String,
    pub secret: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
}

/// Where the allowlist comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowlistStrategy {
    /// `AUTH_ALLOWED_EMAILS` as captured at startup (absent stays absent).
    Local { allowed_emails: Option<String> },
    Remote(RemoteSettings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub strategy: AllowlistStrategy,
    pub bind_addr: SocketAddr,
}

impl GateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank optional values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = setting(BIND_ADDR_KEY).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_raw.clone()))?;

        let strategy_name = setting(STRATEGY_KEY)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "local".to_string());

        let strategy = match strategy_name.as_str() {
            "local" => AllowlistStrategy::Local {
                allowed_emails: lookup(ALLOWED_EMAILS_SETTING),
            },
            "remote" => {
                let project_id = PROJECT_KEYS
                    .iter()
                    .find_map(|k| setting(*k))
                    .ok_or(ConfigError::MissingProject)?;

                AllowlistStrategy::Remote(RemoteSettings {
                    project_id: project_id.trim().to_string(),
                    secret: setting(SECRET_KEY)
                        .unwrap_or_else(|| ALLOWED_EMAILS_SECRET.to_string()),
                    endpoint: setting(ENDPOINT_KEY)
                        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                    access_token: setting(ACCESS_TOKEN_KEY),
                    cache_ttl: Duration::from_secs(parse_number(
                        CACHE_TTL_KEY,
                        setting(CACHE_TTL_KEY),
                        DEFAULT_CACHE_TTL_SECS,
                    )?),
                    fetch_timeout: Duration::from_millis(parse_number(
                        FETCH_TIMEOUT_KEY,
                        setting(FETCH_TIMEOUT_KEY),
                        DEFAULT_FETCH_TIMEOUT_MS,
                    )?),
                })
            }
            other => return Err(ConfigError::UnknownStrategy(other.to_string())),
        };

        Ok(Self {
            strategy,
            bind_addr,
        })
    }

    /// Construct the allowlist source for the configured strategy.
    pub fn build_source(&self) -> Result<Arc<dyn AllowlistSource>, SecretStoreError> {
        match &self.strategy {
            AllowlistStrategy::Local { allowed_emails } => {
                Ok(Arc::new(LocalAllowlistSource::new(allowed_emails.clone())))
            }
            AllowlistStrategy::Remote(remote) => {
                let mut client_config = SecretManagerConfig::new(remote.project_id.clone());
                client_config.endpoint = remote.endpoint.clone();
                client_config.request_timeout = remote.fetch_timeout;
                if let Some(token) = &remote.access_token {
                    client_config.token = AccessTokenSource::Static(token.clone());
                }

                let client = SecretManagerClient::new(client_config)?;
                let options = RemoteSourceOptions {
                    secret: remote.secret.clone(),
                    fetch_timeout: remote.fetch_timeout,
                    freshness: remote.cache_ttl,
                };
                Ok(Arc::new(RemoteAllowlistSource::new(Arc::new(client), options)))
            }
        }
    }
}

fn parse_number(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<GateConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GateConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_strategy() {
        let cfg = config(&[(ALLOWED_EMAILS_SETTING, "a@x.com")]).unwrap();
        assert_eq!(
            cfg.strategy,
            AllowlistStrategy::Local {
                allowed_emails: Some("a@x.com".to_string())
            }
        );
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn local_without_setting_keeps_it_absent() {
        let cfg = config(&[]).unwrap();
        assert_eq!(
            cfg.strategy,
            AllowlistStrategy::Local {
                allowed_emails: None
            }
        );
    }

    #[test]
    fn remote_reads_project_and_defaults() {
        let cfg = config(&[(STRATEGY_KEY, "Remote"), ("GCLOUD_PROJECT", "demo")]).unwrap();
        let AllowlistStrategy::Remote(remote) = cfg.strategy else {
            panic!("expected remote strategy");
        };
        assert_eq!(remote.project_id, "demo");
        assert_eq!(remote.secret, ALLOWED_EMAILS_SECRET);
        assert_eq!(remote.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(remote.cache_ttl, Duration::from_secs(60));
        assert_eq!(remote.fetch_timeout, Duration::from_millis(3_000));
        assert_eq!(remote.access_token, None);
    }

    #[test]
    fn google_cloud_project_takes_precedence() {
        let cfg = config(&[
            (STRATEGY_KEY, "remote"),
            ("GOOGLE_CLOUD_PROJECT", "primary"),
            ("GCLOUD_PROJECT", "legacy"),
            (CACHE_TTL_KEY, "0"),
            (FETCH_TIMEOUT_KEY, "250"),
        ])
        .unwrap();
        let AllowlistStrategy::Remote(remote) = cfg.strategy else {
            panic!("expected remote strategy");
        };
        assert_eq!(remote.project_id, "primary");
        assert_eq!(remote.cache_ttl, Duration::ZERO);
        assert_eq!(remote.fetch_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_invalid_settings() {
        assert_eq!(
            config(&[(STRATEGY_KEY, "ldap")]),
            Err(ConfigError::UnknownStrategy("ldap".to_string()))
        );
        assert_eq!(
            config(&[(STRATEGY_KEY, "remote")]),
            Err(ConfigError::MissingProject)
        );
        assert!(matches!(
            config(&[
                (STRATEGY_KEY, "remote"),
                ("GCLOUD_PROJECT", "demo"),
                (CACHE_TTL_KEY, "soon"),
            ]),
            Err(ConfigError::InvalidNumber { key: CACHE_TTL_KEY, .. })
        ));
        assert!(matches!(
            config(&[(BIND_ADDR_KEY, "localhost")]),
            Err(ConfigError::InvalidBindAddr(_))
        ));
    }

    #[tokio::test]
    async fn builds_source_for_each_strategy() {
        let local = config(&[(ALLOWED_EMAILS_SETTING, "a@x.com")])
            .unwrap()
            .build_source()
            .unwrap();
        assert_eq!(local.strategy(), "local");
        assert!(local.resolve().await.unwrap().contains("a@x.com"));

        let remote = config(&[
            (STRATEGY_KEY, "remote"),
            ("GCLOUD_PROJECT", "demo"),
            (ACCESS_TOKEN_KEY, "t"),
        ])
        .unwrap()
        .build_source()
        .unwrap();
        assert_eq!(remote.strategy(), "remote");
    }
}
