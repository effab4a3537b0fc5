//! Gate error model.

use thiserror::Error;

/// Result type used across the gate.
pub type GateResult<T> = Result<T, GateError>;

/// Classified failure of a gate evaluation.
///
/// Every variant is a non-allow outcome. `Configuration` and `Upstream` have
/// different root causes but share the `internal` code at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The identity event carried no usable email.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The allowlist is absent, empty, or unparsable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote source of truth could not be reached and nothing usable was cached.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The email is not a member of the resolved allowlist.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Machine-readable failure code surfaced to the identity provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailureCode {
    InvalidArgument,
    Internal,
    PermissionDenied,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::InvalidArgument => "invalid-argument",
            FailureCode::Internal => "internal",
            FailureCode::PermissionDenied => "permission-denied",
        }
    }
}

impl core::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GateError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn code(&self) -> FailureCode {
        match self {
            GateError::InvalidArgument(_) => FailureCode::InvalidArgument,
            GateError::Configuration(_) | GateError::Upstream(_) => FailureCode::Internal,
            GateError::PermissionDenied(_) => FailureCode::PermissionDenied,
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Internal failures collapse to generic text; the detailed message is for logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            GateError::InvalidArgument(_) => "Email is required.",
            GateError::Configuration(_) => "Configuration error.",
            GateError::Upstream(_) => "Error verifying authorization.",
            GateError::PermissionDenied(_) => "Email not allowed.",
        }
    }

    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::InvalidArgument(_) => "invalid_argument",
            GateError::Configuration(_) => "configuration",
            GateError::Upstream(_) => "upstream",
            GateError::PermissionDenied(_) => "permission_denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_and_upstream_share_internal_code() {
        assert_eq!(GateError::configuration("x").code(), FailureCode::Internal);
        assert_eq!(GateError::upstream("x").code(), FailureCode::Internal);
        assert_ne!(GateError::configuration("x"), GateError::upstream("x"));
    }

    #[test]
    fn codes_render_as_wire_strings() {
        assert_eq!(
            GateError::invalid_argument("missing").code().to_string(),
            "invalid-argument"
        );
        assert_eq!(
            GateError::permission_denied("nope").code().as_str(),
            "permission-denied"
        );
    }

    #[test]
    fn public_message_hides_internal_detail() {
        let err = GateError::upstream("secret manager returned 503 for projects/p/secrets/s");
        assert!(!err.public_message().contains("503"));
        assert_eq!(err.public_message(), "Error verifying authorization.");
    }
}
