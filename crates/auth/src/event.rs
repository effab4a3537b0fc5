use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Which blocking trigger invoked the gate.
///
/// Both triggers share the identical evaluation contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerKind {
    BeforeCreate,
    BeforeSignIn,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::BeforeCreate => "before_create",
            TriggerKind::BeforeSignIn => "before_sign_in",
        }
    }

    /// Recognize a trigger from any of the provider's spellings: the short
    /// camelCase name or a qualified event type such as
    /// `providers/cloud.auth/eventTypes/user.beforeSignIn:google.com`.
    pub fn from_event_type(raw: &str) -> Option<Self> {
        let lowered = raw.to_ascii_lowercase().replace('_', "");
        if lowered.contains("beforecreate") {
            Some(TriggerKind::BeforeCreate)
        } else if lowered.contains("beforesignin") {
            Some(TriggerKind::BeforeSignIn)
        } else {
            None
        }
    }
}

impl core::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user record attached to an identity event.
///
/// Every field may be missing; the identity provider omits what it does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: Option<bool>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub provider_id: Option<String>,

    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Event supplied by the identity provider immediately before account creation
/// or sign-in. Read-only from the gate's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityEvent {
    #[serde(default)]
    pub event_id: Option<String>,

    /// Informational only; unrecognized spellings become `None`.
    #[serde(default, deserialize_with = "lenient_trigger")]
    pub event_type: Option<TriggerKind>,

    /// Informational only; RFC 3339 or RFC 2822, anything else becomes `None`.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub data: Option<UserRecord>,
}

impl IdentityEvent {
    /// Minimal event carrying only a trigger kind and an email.
    pub fn with_email(kind: TriggerKind, email: impl Into<String>) -> Self {
        Self {
            event_type: Some(kind),
            data: Some(UserRecord {
                email: Some(email.into()),
                ..UserRecord::default()
            }),
            ..Self::default()
        }
    }

    /// Raw email as supplied, if any.
    pub fn email(&self) -> Option<&str> {
        self.data.as_ref()?.email.as_deref()
    }

    pub fn uid(&self) -> Option<&str> {
        self.data.as_ref()?.uid.as_deref()
    }
}

/// Accepts any JSON value; only strings are kept.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseString {
    Text(String),
    Other(IgnoredAny),
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LooseString>::deserialize(deserializer)? {
        Some(LooseString::Text(text)) => Some(text),
        Some(LooseString::Other(_)) | None => None,
    })
}

fn lenient_trigger<'de, D>(deserializer: D) -> Result<Option<TriggerKind>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.and_then(|raw| TriggerKind::from_event_type(&raw)))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.and_then(|raw| {
        DateTime::parse_from_rfc3339(raw.trim())
            .or_else(|_| DateTime::parse_from_rfc2822(raw.trim()))
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }))
}
