//! Allowlist parsing and membership.
//!
//! Both stored entries and candidate emails go through [`normalize_email`], so
//! membership is insensitive to case and surrounding whitespace.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};
use crate::value_object::ValueObject;

/// Name of the process-wide setting carrying the comma-separated allowlist.
pub const ALLOWED_EMAILS_SETTING: &str = "AUTH_ALLOWED_EMAILS";

/// Name of the remote secret carrying the comma-separated allowlist.
pub const ALLOWED_EMAILS_SECRET: &str = "auth-allowed-emails";

/// Trim, then lower-case.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A single normalized, non-empty email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowlistEntry(String);

impl AllowlistEntry {
    /// Returns `None` when the token is empty after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_email(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for AllowlistEntry {}

impl core::fmt::Display for AllowlistEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authoritative set of permitted emails.
///
/// Only obtainable through [`Allowlist::parse`], which either yields a complete,
/// non-empty set or fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowlist {
    entries: BTreeSet<AllowlistEntry>,
}

impl Allowlist {
    /// Parse a comma-separated allowlist.
    ///
    /// Tokens are trimmed and lower-cased; empty tokens are dropped and
    /// duplicates collapse. An empty result is a configuration error, never an
    /// empty-but-valid set.
    pub fn parse(raw: &str) -> GateResult<Self> {
        if raw.trim().is_empty() {
            return Err(GateError::configuration(format!(
                "{ALLOWED_EMAILS_SETTING} is missing or empty"
            )));
        }

        let entries: BTreeSet<AllowlistEntry> =
            raw.split(',').filter_map(AllowlistEntry::parse).collect();

        if entries.is_empty() {
            return Err(GateError::configuration(format!(
                "{ALLOWED_EMAILS_SETTING} contains no addresses after parsing"
            )));
        }

        Ok(Self { entries })
    }

    /// Membership check; the candidate is normalized first.
    pub fn contains(&self, candidate: &str) -> bool {
        match AllowlistEntry::parse(candidate) {
            Some(entry) => self.entries.contains(&entry),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a parsed allowlist; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &AllowlistEntry> {
        self.entries.iter()
    }
}
