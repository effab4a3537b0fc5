//! `allowgate-core` — pure decision primitives for the pre-authentication gate.
//!
//! This crate contains **no IO**: error taxonomy, email normalization and the
//! allowlist value types.

pub mod allowlist;
pub mod error;
pub mod id;
pub mod value_object;

pub use allowlist::{
    ALLOWED_EMAILS_SECRET, ALLOWED_EMAILS_SETTING, Allowlist, AllowlistEntry, normalize_email,
};
pub use error::{FailureCode, GateError, GateResult};
pub use id::InvocationId;
pub use value_object::ValueObject;
