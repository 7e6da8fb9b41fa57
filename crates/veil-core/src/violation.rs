use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result};

/// Category tag of a finding, e.g. `EMAIL_ADDRESS`.
///
/// The set is open: the built-in categories are constants, custom strategies
/// may introduce their own tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationKind(Cow<'static, str>);

impl ViolationKind {
    pub const EMAIL_ADDRESS: ViolationKind = ViolationKind(Cow::Borrowed("EMAIL_ADDRESS"));
    pub const PHONE_NUMBER: ViolationKind = ViolationKind(Cow::Borrowed("PHONE_NUMBER"));
    pub const IP_ADDRESS: ViolationKind = ViolationKind(Cow::Borrowed("IP_ADDRESS"));
    pub const URL: ViolationKind = ViolationKind(Cow::Borrowed("URL"));

    /// Parse a category tag. Tags are non-empty and made of `A-Z`, `0-9` and `_`.
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        let valid = !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(Error::Validation(format!("Invalid violation category: {:?}", tag)));
        }
        Ok(Self(Cow::Owned(tag.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Redaction marker substituted for matched literals, e.g. `[EMAIL_ADDRESS]`.
    pub fn marker(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single detected finding.
///
/// Values are never mutated in place: dismissal and context attachment
/// produce new values through the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub payload: String,
    #[serde(with = "millis")]
    pub detected_at: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "millis::option"
    )]
    pub dismissed_until: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Violation {
    /// Create a fresh finding detected now.
    pub fn new(kind: ViolationKind, payload: impl Into<String>) -> Self {
        Self::detected_at(kind, payload, now_millis())
    }

    /// Create a fresh finding with an explicit detection time.
    ///
    /// The id is `{type}-{detectedAt millis}-{random suffix}`.
    pub fn detected_at(kind: ViolationKind, payload: impl Into<String>, at: OffsetDateTime) -> Self {
        let at = truncate_to_millis(at);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}-{}", kind, unix_millis(at), &suffix[..9]);
        Self {
            id,
            kind,
            payload: payload.into(),
            detected_at: at,
            dismissed_until: None,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|c| !c.is_empty());
        self
    }

    pub fn with_dismissed_until(mut self, until: OffsetDateTime) -> Self {
        self.dismissed_until = Some(truncate_to_millis(until));
        self
    }

    /// Active when never dismissed or when the dismiss window has elapsed.
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        match self.dismissed_until {
            None => true,
            Some(until) => until < now,
        }
    }

    pub fn is_dismissed_at(&self, now: OffsetDateTime) -> bool {
        !self.is_active_at(now)
    }
}

/// Current UTC time truncated to millisecond precision, the resolution
/// timestamps are persisted with.
pub fn now_millis() -> OffsetDateTime {
    truncate_to_millis(OffsetDateTime::now_utc())
}

fn truncate_to_millis(at: OffsetDateTime) -> OffsetDateTime {
    let nanos = at.nanosecond() / 1_000_000 * 1_000_000;
    at.replace_nanosecond(nanos).unwrap_or(at)
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_unix_millis(millis: i64) -> std::result::Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
}

/// Unix milliseconds as a plain `i64`, so records survive serde's buffered
/// (tagged and flattened) representations.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::unix_millis(*at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        super::from_unix_millis(millis).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            at: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_some(&super::super::unix_millis(*at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            Option::<i64>::deserialize(deserializer)?
                .map(|millis| super::super::from_unix_millis(millis).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
