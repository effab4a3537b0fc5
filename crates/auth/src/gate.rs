//! Per-event allow/deny decision.

use std::sync::Arc;

use allowgate_core::{FailureCode, GateError, GateResult, InvocationId, normalize_email};

use crate::event::IdentityEvent;
use crate::source::AllowlistSource;

/// Tracing target carrying exactly one audit line per evaluation.
pub const AUDIT_TARGET: &str = "allowgate::audit";

/// Successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowed {
    /// Normalized email that matched the allowlist.
    pub email: String,
    /// Size of the allowlist the email was checked against.
    pub allowlist_size: usize,
}

/// Outcome of a gate evaluation as a value rather than a `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The identity was examined and rejected (missing email or not listed).
    Deny(GateError),
    /// No verdict could be reached because the allowlist was unavailable.
    ConfigurationError(GateError),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl From<GateResult<Allowed>> for Decision {
    fn from(value: GateResult<Allowed>) -> Self {
        match value {
            Ok(_) => Decision::Allow,
            Err(e) => match e.code() {
                FailureCode::Internal => Decision::ConfigurationError(e),
                FailureCode::InvalidArgument | FailureCode::PermissionDenied => {
                    Decision::Deny(e)
                }
            },
        }
    }
}

/// Pre-authentication gate.
///
/// Default-deny: anything short of a positive allowlist match ends in an error.
#[derive(Clone)]
pub struct AuthorizationGate {
    source: Arc<dyn AllowlistSource>,
}

impl AuthorizationGate {
    pub fn new(source: Arc<dyn AllowlistSource>) -> Self {
        Self { source }
    }

    pub fn strategy(&self) -> &'static str {
        self.source.strategy()
    }

    /// Evaluate one identity event.
    ///
    /// - missing/blank email → `InvalidArgument`, before the allowlist is resolved
    /// - source failures propagate unchanged
    /// - non-member → `PermissionDenied`
    pub async fn evaluate(&self, event: &IdentityEvent) -> GateResult<Allowed> {
        let outcome = self.check(event).await;
        audit(event, &outcome);
        outcome
    }

    /// Same as [`evaluate`](Self::evaluate), folded into a [`Decision`].
    pub async fn decide(&self, event: &IdentityEvent) -> Decision {
        self.evaluate(event).await.into()
    }

    async fn check(&self, event: &IdentityEvent) -> GateResult<Allowed> {
        let email = event
            .email()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| GateError::invalid_argument("Email is required"))?;

        let allowlist = self.source.resolve().await?;

        if allowlist.contains(&email) {
            Ok(Allowed {
                email,
                allowlist_size: allowlist.len(),
            })
        } else {
            Err(GateError::permission_denied("email not authorized"))
        }
    }
}

fn audit(event: &IdentityEvent, outcome: &GateResult<Allowed>) {
    let invocation = match &event.event_id {
        Some(id) => id.clone(),
        None => InvocationId::new().to_string(),
    };
    let trigger = event.event_type.map(|t| t.as_str()).unwrap_or("unknown");
    let uid = event.uid().unwrap_or("");
    let email = event.email().unwrap_or("");

    match outcome {
        Ok(allowed) => tracing::info!(
            target: AUDIT_TARGET,
            invocation = %invocation,
            trigger,
            uid,
            email = %allowed.email,
            outcome = "allow",
            allowlist_size = allowed.allowlist_size,
            "identity allowed"
        ),
        Err(err @ (GateError::PermissionDenied(_) | GateError::InvalidArgument(_))) => {
            tracing::warn!(
                target: AUDIT_TARGET,
                invocation = %invocation,
                trigger,
                uid,
                email,
                outcome = "deny",
                reason = err.kind(),
                "identity blocked: {err}"
            )
        }
        Err(err) => tracing::error!(
            target: AUDIT_TARGET,
            invocation = %invocation,
            trigger,
            uid,
            email,
            outcome = "deny",
            reason = err.kind(),
            "identity blocked, allowlist unavailable: {err}"
        ),
    }
}
