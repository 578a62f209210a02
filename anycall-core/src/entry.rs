use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Header name → value(s), keyed by lower-cased header name.
pub type HeaderMap = BTreeMap<String, HeaderValue>;

/// A captured header value.
///
/// Headers seen once serialize as a plain string; repeated headers keep every
/// occurrence in arrival order and serialize as an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// First value, used for headers that are semantically single-valued.
    pub fn first(&self) -> Option<&str> {
        match self {
            HeaderValue::Single(v) => Some(v.as_str()),
            HeaderValue::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    /// Display form: list values joined with `", "`.
    pub fn joined(&self) -> String {
        match self {
            HeaderValue::Single(v) => v.clone(),
            HeaderValue::Multi(vs) => vs.join(", "),
        }
    }

    /// Append another occurrence of the same header.
    pub fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderValue::Multi(vec![first, value]);
            }
            HeaderValue::Multi(vs) => vs.push(value),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Single(v.to_string())
    }
}

/// One recorded snapshot of an inbound request's metadata.
///
/// Entries are immutable once stored. There is no ID: an entry is identified
/// by its position in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 UTC, millisecond precision.
    pub timestamp: String,
    pub method: String,
    #[serde(default = "empty_object")]
    pub query: Value,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: HeaderMap,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub origin: String,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl LogEntry {
    /// Start an entry for `method`, stamped with the current UTC time.
    pub fn new(method: impl Into<String>) -> Self {
        Self::at(Utc::now(), method)
    }

    /// Start an entry stamped with an explicit time.
    pub fn at(time: DateTime<Utc>, method: impl Into<String>) -> Self {
        Self {
            timestamp: format_timestamp(time),
            method: method.into(),
            query: empty_object(),
            body: Value::Null,
            headers: HeaderMap::new(),
            ip: None,
            browser: None,
            os: None,
            origin: String::new(),
        }
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }

    pub fn with_client(mut self, browser: Option<String>, os: Option<String>) -> Self {
        self.browser = browser;
        self.os = os;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Parsed timestamp, if the stored string is well-formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// `2024-05-01T12:00:00.123Z`
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
