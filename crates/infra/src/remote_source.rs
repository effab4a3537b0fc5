//! Remote allowlist strategy with a freshness window and stale fallback.
//!
//! Cache rules:
//! - a cached allowlist younger than `freshness` is served without a fetch
//! - the cache is replaced whole, and only after a successful fetch and parse
//! - an upstream failure (transport, auth, timeout) serves the last good
//!   allowlist if one was ever obtained, otherwise it propagates
//! - configuration failures always propagate and leave the cache untouched
//! - one invocation waits at most `fetch_timeout`, queueing included; callers
//!   that queued behind a failed refresh take its outcome instead of refetching

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use allowgate_auth::AllowlistSource;
use allowgate_core::{ALLOWED_EMAILS_SECRET, Allowlist, GateError, GateResult};

use crate::secret_store::SecretStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSourceOptions {
    /// Secret holding the comma-separated allowlist.
    pub secret: String,

    /// Upper bound on one resolve: time queued behind another refresh plus
    /// the fetch itself, including token acquisition.
    pub fetch_timeout: Duration,

    /// How long a fetched allowlist is served without refetching.
    /// Zero disables fresh hits; stale fallback still applies.
    pub freshness: Duration,
}

impl Default for RemoteSourceOptions {
    fn default() -> Self {
        Self {
            secret: ALLOWED_EMAILS_SECRET.to_string(),
            fetch_timeout: Duration::from_secs(3),
            freshness: Duration::from_secs(60),
        }
    }
}

/// Snapshot of the last successfully resolved allowlist.
#[derive(Debug)]
pub struct CachedAllowlist {
    pub allowlist: Arc<Allowlist>,
    /// Secret version the allowlist was parsed from.
    pub version: String,
    pub fetched_at: DateTime<Utc>,
    loaded_at: Instant,
}

impl CachedAllowlist {
    fn is_fresh(&self, freshness: Duration) -> bool {
        !freshness.is_zero() && self.loaded_at.elapsed() < freshness
    }
}

/// [`AllowlistSource`] reading the latest version of a secret.
pub struct RemoteAllowlistSource {
    store: Arc<dyn SecretStore>,
    options: RemoteSourceOptions,
    cached: RwLock<Option<Arc<CachedAllowlist>>>,
    last_failure: RwLock<Option<(Instant, GateError)>>,
    refresh: Mutex<()>,
}

impl RemoteAllowlistSource {
    pub fn new(store: Arc<dyn SecretStore>, options: RemoteSourceOptions) -> Self {
        Self {
            store,
            options,
            cached: RwLock::new(None),
            last_failure: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &RemoteSourceOptions {
        &self.options
    }

    /// Current cache snapshot, fresh or stale.
    pub fn cached(&self) -> Option<Arc<CachedAllowlist>> {
        match self.cached.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn fresh(&self) -> Option<Arc<CachedAllowlist>> {
        self.cached()
            .filter(|c| c.is_fresh(self.options.freshness))
    }

    fn replace(&self, entry: Arc<CachedAllowlist>) {
        match self.cached.write() {
            Ok(mut guard) => *guard = Some(entry),
            Err(poisoned) => *poisoned.into_inner() = Some(entry),
        }
    }

    fn record_failure(&self, err: &GateError) {
        let entry = Some((Instant::now(), err.clone()));
        match self.last_failure.write() {
            Ok(mut guard) => *guard = entry,
            Err(poisoned) => *poisoned.into_inner() = entry,
        }
    }

    /// Failure of a refresh that completed at or after `since`.
    fn failure_since(&self, since: Instant) -> Option<GateError> {
        let last = match self.last_failure.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        last.filter(|(at, _)| *at >= since).map(|(_, err)| err)
    }

    fn timed_out(&self) -> GateError {
        GateError::upstream(format!(
            "fetching secret '{}' timed out after {:?}",
            self.options.secret, self.options.fetch_timeout
        ))
    }

    /// Serve the last good allowlist on upstream failures; everything else propagates.
    fn fall_back(&self, err: GateError) -> GateResult<Arc<Allowlist>> {
        let GateError::Upstream(msg) = err else {
            return Err(err);
        };
        match self.cached() {
            Some(stale) => {
                tracing::warn!(
                    version = %stale.version,
                    fetched_at = %stale.fetched_at,
                    error = %msg,
                    "allowlist refresh failed; serving stale allowlist"
                );
                Ok(stale.allowlist.clone())
            }
            None => Err(GateError::Upstream(msg)),
        }
    }

    async fn fetch(&self, deadline: Instant) -> GateResult<CachedAllowlist> {
        let secret = self.options.secret.as_str();
        let version =
            match tokio::time::timeout_at(deadline, self.store.access_latest(secret)).await {
                Ok(Ok(version)) => version,
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(self.timed_out()),
            };

        let allowlist = Allowlist::parse(&version.payload).map_err(|err| match err {
            GateError::Configuration(msg) => {
                GateError::configuration(format!("{}: {msg}", version.name))
            }
            other => other,
        })?;

        Ok(CachedAllowlist {
            allowlist: Arc::new(allowlist),
            version: version.name,
            fetched_at: Utc::now(),
            loaded_at: Instant::now(),
        })
    }
}

#[async_trait]
impl AllowlistSource for RemoteAllowlistSource {
    async fn resolve(&self) -> GateResult<Arc<Allowlist>> {
        if let Some(hit) = self.fresh() {
            return Ok(hit.allowlist.clone());
        }

        // One deadline covers queueing and fetching.
        let started = Instant::now();
        let deadline = started + self.options.fetch_timeout;

        // Single writer. While a refresh is in flight, callers with a cached
        // value are served it instead of queueing behind the fetch.
        let (_refresh, waited) = match self.refresh.try_lock() {
            Ok(guard) => (guard, false),
            Err(_) => {
                if let Some(stale) = self.cached() {
                    tracing::debug!(version = %stale.version, "refresh in flight; serving cached allowlist");
                    return Ok(stale.allowlist.clone());
                }
                match tokio::time::timeout_at(deadline, self.refresh.lock()).await {
                    Ok(guard) => (guard, true),
                    Err(_) => return self.fall_back(self.timed_out()),
                }
            }
        };

        if let Some(hit) = self.fresh() {
            return Ok(hit.allowlist.clone());
        }

        // The refresh we queued behind already failed; share its outcome.
        if waited {
            if let Some(err) = self.failure_since(started) {
                return self.fall_back(err);
            }
        }

        match self.fetch(deadline).await {
            Ok(entry) => {
                let entry = Arc::new(entry);
                tracing::info!(
                    version = %entry.version,
                    entries = entry.allowlist.len(),
                    "allowlist refreshed"
                );
                self.replace(entry.clone());
                Ok(entry.allowlist.clone())
            }
            Err(err) => {
                self.record_failure(&err);
                self.fall_back(err)
            }
        }
    }

    fn strategy(&self) -> &'static str {
        "remote"
    }
}
