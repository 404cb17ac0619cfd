//! Canonical identity envelope and raw payload parsing.
//!
//! Raw identity blobs arrive in two encodings:
//! - a JSON object (`{"user": {...}}` or flat user keys)
//! - a URL-encoded string (`user=%7B...%7D&auth_date=...` or `user_id=42&first_name=...`)
//!
//! A `user` value may itself be a JSON-encoded string. A nested
//! `init_data.user` object is accepted too. When no user object exists the
//! recognized user keys are read from the top level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Keys copied from the user object into [`IdentityEnvelope::fields`].
pub const USER_KEYS: [&str; 6] = ["user_id", "id", "first_name", "last_name", "username", "name"];

/// Wrapper keys whose string value is itself a raw identity blob.
const NESTED_BLOB_KEYS: [&str; 2] = ["initData", "init_data"];

/// Channel an envelope came from, in decreasing order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Embedded host object exposing `initData`.
    HostSdk,
    /// Message from the parent frame (live or cached).
    CrossMessage,
    /// Query parameters of the launch URL.
    UrlParams,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentitySource::HostSdk => "host_sdk",
            IdentitySource::CrossMessage => "cross_message",
            IdentitySource::UrlParams => "url_params",
        };
        f.write_str(name)
    }
}

/// Normalized identity record plus its originating channel.
///
/// Immutable once built; fields are only reachable through accessors.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityEnvelope {
    source: IdentitySource,
    raw_payload: String,
    fields: BTreeMap<String, String>,
}

impl IdentityEnvelope {
    /// Parse `raw` into an envelope. `None` when no user data is recognizable.
    pub fn parse(source: IdentitySource, raw: &str) -> Option<Self> {
        let fields = parse_identity_fields(raw)?;
        Some(Self {
            source,
            raw_payload: raw.trim().to_string(),
            fields,
        })
    }

    pub fn source(&self) -> IdentitySource {
        self.source
    }

    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

// Raw payloads may carry signed host data; keep them out of logs.
impl fmt::Debug for IdentityEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityEnvelope")
            .field("source", &self.source)
            .field("raw_payload_len", &self.raw_payload.len())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Extract the recognized user fields from a raw identity blob.
pub fn parse_identity_fields(raw: &str) -> Option<BTreeMap<String, String>> {
    let data = decode_blob(raw)?;

    for key in NESTED_BLOB_KEYS {
        if let Some(Value::String(inner)) = data.get(key) {
            if let Some(fields) = parse_identity_fields(inner) {
                return Some(fields);
            }
        }
    }

    let user = find_user_object(&data).unwrap_or(data);

    let fields: BTreeMap<String, String> = USER_KEYS
        .iter()
        .filter_map(|key| {
            let value = scalar_to_string(user.get(*key)?)?;
            Some((key.to_string(), value))
        })
        .collect();

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// Decode either encoding into a JSON object.
fn decode_blob(raw: &str) -> Option<Map<String, Value>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.starts_with('{') {
        return match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
    }

    let map: Map<String, Value> = url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect();

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn find_user_object(data: &Map<String, Value>) -> Option<Map<String, Value>> {
    match data.get("user") {
        Some(Value::Object(map)) => return Some(map.clone()),
        Some(Value::String(encoded)) => {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(encoded) {
                return Some(map);
            }
        }
        _ => {}
    }

    match data.get("init_data") {
        Some(Value::Object(init)) => match init.get("user") {
            Some(Value::Object(map)) => Some(map.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_encoded_flat_fields() {
        let fields = parse_identity_fields("user_id=42&first_name=Ann&last_name=").unwrap();
        assert_eq!(fields.get("user_id").map(String::as_str), Some("42"));
        assert_eq!(fields.get("first_name").map(String::as_str), Some("Ann"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn test_parse_json_with_user_object() {
        let raw = r#"{"user": {"id": 7, "username": "ann_k", "first_name": "Ann"}, "auth_date": 1}"#;
        let fields = parse_identity_fields(raw).unwrap();
        assert_eq!(fields.get("id").map(String::as_str), Some("7"));
        assert_eq!(fields.get("username").map(String::as_str), Some("ann_k"));
        assert!(!fields.contains_key("auth_date"));
    }

    #[test]
    fn test_parse_url_encoded_with_json_user_string() {
        let raw = "query_id=abc&user=%7B%22id%22%3A99%2C%22first_name%22%3A%22Bo%22%7D&hash=ff";
        let fields = parse_identity_fields(raw).unwrap();
        assert_eq!(fields.get("id").map(String::as_str), Some("99"));
        assert_eq!(fields.get("first_name").map(String::as_str), Some("Bo"));
    }

    #[test]
    fn test_parse_nested_init_data_user() {
        let raw = r#"{"init_data": {"user": {"user_id": "5", "name": "Cy"}}}"#;
        let fields = parse_identity_fields(raw).unwrap();
        assert_eq!(fields.get("user_id").map(String::as_str), Some("5"));
        assert_eq!(fields.get("name").map(String::as_str), Some("Cy"));
    }

    #[test]
    fn test_parse_wrapped_init_data_string() {
        let raw = "initData=user_id%3D42%26first_name%3DAnn";
        let fields = parse_identity_fields(raw).unwrap();
        assert_eq!(fields.get("user_id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_unrecognized_payloads_are_rejected() {
        assert!(parse_identity_fields("").is_none());
        assert!(parse_identity_fields("   ").is_none());
        assert!(parse_identity_fields("foo=bar&baz=1").is_none());
        assert!(parse_identity_fields("{broken json").is_none());
        assert!(parse_identity_fields("[1,2,3]").is_none());
        assert!(parse_identity_fields(r#"{"user": null}"#).is_none());
    }

    #[test]
    fn test_envelope_accessors_and_debug() {
        let envelope =
            IdentityEnvelope::parse(IdentitySource::UrlParams, " user_id=42&username=ann ").unwrap();
        assert_eq!(envelope.source(), IdentitySource::UrlParams);
        assert_eq!(envelope.raw_payload(), "user_id=42&username=ann");
        assert_eq!(envelope.field("username"), Some("ann"));
        assert_eq!(envelope.field("missing"), None);

        let rendered = format!("{:?}", envelope);
        assert!(!rendered.contains("ann"));
        assert!(rendered.contains("raw_payload_len"));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(IdentitySource::HostSdk.to_string(), "host_sdk");
        assert_eq!(IdentitySource::CrossMessage.to_string(), "cross_message");
        assert_eq!(IdentitySource::UrlParams.to_string(), "url_params");
    }
}
