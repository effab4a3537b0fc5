//! `allowgate-auth` — the pre-authentication decision boundary.
//!
//! This crate is intentionally decoupled from HTTP and from any particular
//! configuration backend: the gate only sees an [`AllowlistSource`].

pub mod event;
pub mod gate;
pub mod source;

pub use event::{IdentityEvent, TriggerKind, UserRecord};
pub use gate::{AUDIT_TARGET, Allowed, AuthorizationGate, Decision};
pub use source::{AllowlistSource, LocalAllowlistSource};
