//! Turning a raw HTTP request into a [`LogEntry`].
//!
//! Everything here is best-effort: a request is always recorded, even when its
//! body does not match its declared content type or its headers are not
//! valid UTF-8.

use crate::config::CaptureConfig;
use crate::entry::{HeaderMap, HeaderValue, LogEntry};
use crate::user_agent;
use http::header::{CONTENT_TYPE, ORIGIN, USER_AGENT};
use serde_json::{Map, Value};
use std::net::IpAddr;

/// Replacement string used for masked header values.
pub const REDACTED: &str = "[REDACTED]";

/// Headers carrying credentials or session tokens.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
    "proxy-authorization",
];

/// Builds entries according to the capture settings.
#[derive(Debug, Clone)]
pub struct RequestCapture {
    forwarded_header: String,
    redact_sensitive_headers: bool,
}

impl RequestCapture {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            forwarded_header: config.forwarded_header.to_ascii_lowercase(),
            redact_sensitive_headers: config.redact_sensitive_headers,
        }
    }

    /// Build the entry for one request. `body` is the fully buffered payload
    /// (empty when there is none); `peer` is the transport-level client
    /// address when the server knows it.
    pub fn capture(
        &self,
        method: &http::Method,
        uri: &http::Uri,
        headers: &http::HeaderMap,
        body: &[u8],
        peer: Option<IpAddr>,
    ) -> LogEntry {
        let content_type = header_str(headers, CONTENT_TYPE.as_str());
        let user_agent = header_str(headers, USER_AGENT.as_str());
        let (browser, os) = match user_agent {
            Some(ua) => (user_agent::browser(ua), user_agent::os(ua)),
            None => (None, None),
        };

        let mut captured = capture_headers(headers);
        if self.redact_sensitive_headers {
            redact_sensitive(&mut captured);
        }

        LogEntry::new(method.as_str())
            .with_query(parse_query(uri.query()))
            .with_body(parse_body(content_type, body))
            .with_headers(captured)
            .with_ip(client_ip(headers, &self.forwarded_header, peer))
            .with_client(browser, os)
            .with_origin(header_str(headers, ORIGIN.as_str()).unwrap_or_default())
    }
}

impl Default for RequestCapture {
    fn default() -> Self {
        Self::new(&CaptureConfig::default())
    }
}

/// Copy every header, grouping repeated names in arrival order.
pub fn capture_headers(headers: &http::HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match out.get_mut(name.as_str()) {
            Some(existing) => existing.push(value),
            None => {
                out.insert(name.as_str().to_string(), HeaderValue::Single(value));
            }
        }
    }
    out
}

/// Mask credential-bearing headers in place.
pub fn redact_sensitive(headers: &mut HeaderMap) {
    for name in SENSITIVE_HEADERS {
        if let Some(value) = headers.get_mut(*name) {
            let masked = match &*value {
                HeaderValue::Single(_) => HeaderValue::Single(REDACTED.to_string()),
                HeaderValue::Multi(vs) => HeaderValue::Multi(vec![REDACTED.to_string(); vs.len()]),
            };
            *value = masked;
        }
    }
}

/// Parse a query string into an object. Repeated keys collect into an array.
pub fn parse_query(query: Option<&str>) -> Value {
    let mut map = Map::new();
    let Some(query) = query else {
        return Value::Object(map);
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = Value::String(decode_component(value));
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Value::Object(map)
}

/// Parse a buffered body according to its content type.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }

    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence == "application/json" || essence.ends_with("+json") {
        if let Ok(value) = serde_json::from_slice::<Value>(body) {
            return value;
        }
    } else if essence == "application/x-www-form-urlencoded" {
        return parse_query(Some(&String::from_utf8_lossy(body)));
    }

    Value::String(String::from_utf8_lossy(body).into_owned())
}

/// Client address: the forwarding header verbatim when present, else the peer.
pub fn client_ip(
    headers: &http::HeaderMap,
    forwarded_header: &str,
    peer: Option<IpAddr>,
) -> Option<String> {
    header_str(headers, forwarded_header)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue as RawValue;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &str)]) -> http::HeaderMap {
        let mut map = http::HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, RawValue::from_str(v).unwrap());
        }
        map
    }

    // ── Query ─────────────────────────────────────────────────────

    #[test]
    fn query_none_is_empty_object() {
        assert_eq!(parse_query(None), json!({}));
    }

    #[test]
    fn query_repeated_keys_become_array() {
        let q = parse_query(Some("a=1&b=2&a=3"));
        assert_eq!(q, json!({"a": ["1", "3"], "b": "2"}));
    }

    #[test]
    fn query_decodes_plus_and_percent() {
        let q = parse_query(Some("name=John+Doe&city=S%C3%A3o%20Paulo"));
        assert_eq!(q["name"], "John Doe");
        assert_eq!(q["city"], "São Paulo");
    }

    #[test]
    fn query_key_without_value_maps_to_empty_string() {
        let q = parse_query(Some("flag&&x="));
        assert_eq!(q, json!({"flag": "", "x": ""}));
    }

    // ── Body ──────────────────────────────────────────────────────

    #[test]
    fn empty_body_is_null() {
        assert!(parse_body(Some("application/json"), b"").is_null());
    }

    #[test]
    fn json_body_is_parsed() {
        let v = parse_body(Some("application/json; charset=utf-8"), br#"{"k":[1,true]}"#);
        assert_eq!(v, json!({"k": [1, true]}));
    }

    #[test]
    fn vendor_json_body_is_parsed() {
        let v = parse_body(Some("application/vnd.api+json"), b"[1,2]");
        assert_eq!(v, json!([1, 2]));
    }

    #[test]
    fn invalid_json_body_falls_back_to_text() {
        let v = parse_body(Some("application/json"), b"{not json");
        assert_eq!(v, json!("{not json"));
    }

    #[test]
    fn form_body_is_parsed_like_query() {
        let v = parse_body(Some("application/x-www-form-urlencoded"), b"a=1&a=2&b=x+y");
        assert_eq!(v, json!({"a": ["1", "2"], "b": "x y"}));
    }

    #[test]
    fn other_bodies_are_text() {
        assert_eq!(parse_body(Some("text/plain"), b"hello"), json!("hello"));
        assert_eq!(parse_body(None, b"raw"), json!("raw"));
    }

    // ── Headers ───────────────────────────────────────────────────

    #[test]
    fn repeated_headers_are_grouped() {
        let h = capture_headers(&headers(&[
            ("accept", "*/*"),
            ("x-tag", "one"),
            ("x-tag", "two"),
        ]));
        assert_eq!(h["accept"], HeaderValue::Single("*/*".into()));
        assert_eq!(h["x-tag"], HeaderValue::Multi(vec!["one".into(), "two".into()]));
    }

    #[test]
    fn redaction_masks_only_sensitive_headers() {
        let mut h = capture_headers(&headers(&[
            ("authorization", "Bearer abc"),
            ("cookie", "a=1"),
            ("cookie", "b=2"),
            ("accept", "text/html"),
        ]));
        redact_sensitive(&mut h);
        assert_eq!(h["authorization"], HeaderValue::Single(REDACTED.into()));
        assert_eq!(
            h["cookie"],
            HeaderValue::Multi(vec![REDACTED.into(), REDACTED.into()])
        );
        assert_eq!(h["accept"], HeaderValue::Single("text/html".into()));
    }

    // ── Client IP ─────────────────────────────────────────────────

    #[test]
    fn forwarded_header_wins_over_peer() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1")]);
        let peer = Some("127.0.0.1".parse().unwrap());
        assert_eq!(
            client_ip(&h, "x-forwarded-for", peer),
            Some("1.2.3.4, 10.0.0.1".to_string())
        );
    }

    #[test]
    fn peer_used_when_no_forwarded_header() {
        let peer = Some("::1".parse().unwrap());
        assert_eq!(
            client_ip(&http::HeaderMap::new(), "x-forwarded-for", peer),
            Some("::1".to_string())
        );
    }

    #[test]
    fn blank_forwarded_header_falls_back_to_peer() {
        let h = headers(&[("x-forwarded-for", "  ")]);
        let peer = Some("10.1.1.1".parse().unwrap());
        assert_eq!(client_ip(&h, "x-forwarded-for", peer), Some("10.1.1.1".into()));
    }

    #[test]
    fn no_address_at_all_is_none() {
        assert_eq!(client_ip(&http::HeaderMap::new(), "x-forwarded-for", None), None);
    }

    // ── Full capture ──────────────────────────────────────────────

    #[test]
    fn capture_fills_every_field() {
        let capture = RequestCapture::default();
        let h = headers(&[
            ("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
            ("origin", "https://x.test"),
            ("content-type", "application/json"),
            ("x-forwarded-for", "1.2.3.4"),
        ]);
        let uri: http::Uri = "/api/call?a=1".parse().unwrap();
        let entry = capture.capture(&http::Method::POST, &uri, &h, br#"{"n":1}"#, None);

        assert_eq!(entry.method, "POST");
        assert_eq!(entry.query, json!({"a": "1"}));
        assert_eq!(entry.body, json!({"n": 1}));
        assert_eq!(entry.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(entry.browser.as_deref(), Some("Chrome"));
        assert_eq!(entry.os.as_deref(), Some("Windows"));
        assert_eq!(entry.origin, "https://x.test");
        assert!(entry.parsed_timestamp().is_some());
    }

    #[test]
    fn capture_without_user_agent_or_origin() {
        let capture = RequestCapture::default();
        let uri: http::Uri = "/api/call".parse().unwrap();
        let entry = capture.capture(&http::Method::GET, &uri, &http::HeaderMap::new(), b"", None);
        assert!(entry.browser.is_none());
        assert!(entry.os.is_none());
        assert!(entry.ip.is_none());
        assert_eq!(entry.origin, "");
        assert!(entry.body.is_null());
    }

    #[test]
    fn capture_honours_custom_forwarded_header_and_redaction() {
        let capture = RequestCapture::new(&CaptureConfig {
            forwarded_header: "X-Real-IP".to_string(),
            redact_sensitive_headers: true,
        });
        let h = headers(&[
            ("x-real-ip", "9.9.9.9"),
            ("x-forwarded-for", "1.1.1.1"),
            ("x-api-key", "secret"),
        ]);
        let uri: http::Uri = "/".parse().unwrap();
        let entry = capture.capture(&http::Method::GET, &uri, &h, b"", None);
        assert_eq!(entry.ip.as_deref(), Some("9.9.9.9"));
        assert_eq!(entry.headers["x-api-key"], HeaderValue::Single(REDACTED.into()));
    }
}
