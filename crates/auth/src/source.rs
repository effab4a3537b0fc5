//! Allowlist sources.
//!
//! The gate is strategy-agnostic: it asks an [`AllowlistSource`] for the current
//! allowlist and never looks at where it came from.

use std::sync::Arc;

use async_trait::async_trait;

use allowgate_core::{ALLOWED_EMAILS_SETTING, Allowlist, GateError, GateResult};

/// Capability that produces the current allowlist on demand.
///
/// Implementations must either return a complete allowlist or fail with
/// `GateError::Configuration` / `GateError::Upstream`; never a partial set.
#[async_trait]
pub trait AllowlistSource: Send + Sync {
    async fn resolve(&self) -> GateResult<Arc<Allowlist>>;

    /// Short strategy label for logs (`local`, `remote`, ...).
    fn strategy(&self) -> &'static str;
}

/// Local strategy: a comma-separated string captured from process configuration
/// at startup and injected here.
#[derive(Debug, Clone)]
pub struct LocalAllowlistSource {
    parsed: Result<Arc<Allowlist>, GateError>,
}

impl LocalAllowlistSource {
    /// `None` means the setting was absent; resolution then fails with a
    /// configuration error on every call.
    pub fn new(raw: Option<String>) -> Self {
        let parsed = match raw {
            Some(raw) => Allowlist::parse(&raw).map(Arc::new),
            None => Err(GateError::configuration(format!(
                "{ALLOWED_EMAILS_SETTING} is missing or empty"
            ))),
        };
        Self { parsed }
    }
}

#[async_trait]
impl AllowlistSource for LocalAllowlistSource {
    async fn resolve(&self) -> GateResult<Arc<Allowlist>> {
        self.parsed.clone()
    }

    fn strategy(&self) -> &'static str {
        "local"
    }
}
