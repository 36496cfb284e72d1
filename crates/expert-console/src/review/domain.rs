use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primary key of an expert request row. Stores key rows by integer or by text (uuid),
/// and the value is echoed back in the shape it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Text(String),
}

impl RequestId {
    pub fn is_blank(&self) -> bool {
        match self {
            RequestId::Number(_) => false,
            RequestId::Text(value) => value.trim().is_empty(),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(value) => write!(f, "{value}"),
            RequestId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::Text(value.to_string())
    }
}

/// Status labels used by the review console. Any other non-blank string is accepted too.
pub mod status {
    pub const UNREVIEWED: &str = "未確認";
    pub const APPROVED: &str = "承認";
    pub const REJECTED: &str = "拒否";
    pub const ALLOWED: &str = "許可";
}

/// An applicant record. Only the core columns are typed; every other column is carried
/// through untouched in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertRequest {
    pub id: RequestId,
    pub status: String,
    #[serde(default)]
    pub pic: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// Accepts RFC 3339 timestamps and offset-less ones, which are read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Some(naive.and_utc()))
        .map_err(|err| serde::de::Error::custom(format!("invalid timestamp '{raw}': {err}")))
}

/// Columns written by a single targeted update. `pic` is only present when the change
/// went through operator authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestUpdate {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pic: Option<String>,
}

impl RequestUpdate {
    pub fn status_only(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            pic: None,
        }
    }
}

/// One allowlisted operator, as stored in the allowlist table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevAccount {
    pub mail: String,
}

/// The shared operator mailbox that must escalate to an individual credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonAccount(String);

impl CommonAccount {
    pub fn new(mail: impl Into<String>) -> Self {
        Self(mail.into())
    }

    pub fn mail(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, email: &str) -> bool {
        self.0 == email
    }
}

/// Individual credential supplied when acting as the shared account. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct DevCredential {
    email: String,
    password: String,
}

impl DevCredential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub(crate) fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for DevCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevCredential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A user record returned by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorIdentity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: BTreeMap<String, Value>,
}

impl OperatorIdentity {
    /// Preferred attribution: full name, then name, then the identity's email, then `fallback`.
    pub fn display_name(&self, fallback: &str) -> String {
        ["full_name", "name"]
            .iter()
            .filter_map(|key| self.user_metadata.get(*key).and_then(Value::as_str))
            .chain(self.email.as_deref())
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Output of a successful authorization and the only input that may set `pic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributedApproval {
    pub request_id: RequestId,
    pub new_status: String,
    pub attributed_name: String,
}

impl AttributedApproval {
    pub fn into_update(self) -> (RequestId, RequestUpdate) {
        (
            self.request_id,
            RequestUpdate {
                status: self.new_status,
                pic: Some(self.attributed_name),
            },
        )
    }
}

/// Treats absent and whitespace-only inputs alike.
pub(crate) fn filled(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
