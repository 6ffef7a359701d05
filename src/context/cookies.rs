//! Cookie parsing and queued writes.
//!
//! # Responsibilities
//! - Parse the request `Cookie` header into a name → value map
//! - Queue cookie writes during extraction and reconciliation
//! - Serialize queued writes into `Set-Cookie` header values
//!
//! # Design Decisions
//! - Values are percent-encoded so JSON payloads survive cookie syntax
//! - Attributes (path, max-age, SameSite, Secure) come from `CookieConfig`
//!   and are uniform across all cookies this service owns
//! - Unparseable values decode to their raw form instead of failing

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CookieConfig;

/// A queued cookie write, flushed by the gateway onto the final response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCookie {
    pub name: String,
    pub value: String,
}

/// Request cookies plus the writes queued while handling the request.
#[derive(Debug, Default)]
pub struct CookieJar {
    values: BTreeMap<String, String>,
    pending: Vec<PendingCookie>,
}

impl CookieJar {
    /// Parse a `Cookie` request header. `None` yields an empty jar.
    pub fn from_header(header: Option<&str>) -> Self {
        let mut values = BTreeMap::new();
        if let Some(raw) = header {
            for pair in raw.split(';') {
                let Some((name, value)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                values.insert(name.to_string(), decode_value(value.trim()));
            }
        }
        Self {
            values,
            pending: Vec::new(),
        }
    }

    /// Value of a request cookie, decoded.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Queue a write. Later writes to the same name win.
    pub fn queue_write(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.pending.retain(|c| c.name != name);
        self.pending.push(PendingCookie {
            name,
            value: value.into(),
        });
    }

    /// Writes queued so far, in queue order.
    pub fn pending_writes(&self) -> &[PendingCookie] {
        &self.pending
    }

    /// Render queued writes as `Set-Cookie` header values.
    pub fn set_cookie_headers(&self, config: &CookieConfig) -> Vec<String> {
        let max_age = u64::from(config.max_age_days) * 86_400;
        self.pending
            .iter()
            .map(|cookie| {
                let mut header = format!(
                    "{}={}; Path={}; Max-Age={}; SameSite=Lax",
                    cookie.name,
                    encode_value(&cookie.value),
                    config.path,
                    max_age
                );
                if config.secure {
                    header.push_str("; Secure");
                }
                header
            })
            .collect()
    }
}

/// Read a JSON-valued cookie, e.g. the UTM or experiment map.
pub fn read_json_cookie<T: DeserializeOwned>(jar: &CookieJar, name: &str) -> Option<T> {
    serde_json::from_str(jar.get(name)?).ok()
}

/// Queue a JSON-valued cookie write.
pub fn queue_json_cookie<T: Serialize>(jar: &mut CookieJar, name: &str, value: &T) {
    if let Ok(encoded) = serde_json::to_string(value) {
        jar.queue_write(name, encoded);
    }
}

/// Percent-encode a cookie value. Unreserved characters pass through.
pub fn encode_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decode a percent-encoded cookie value. Malformed escapes are kept as-is.
pub fn decode_value(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(decoded) = hex_pair(bytes.get(i + 1), bytes.get(i + 2)) {
                out.push(decoded);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn hex_pair(high: Option<&u8>, low: Option<&u8>) -> Option<u8> {
    let high = (*high? as char).to_digit(16)?;
    let low = (*low? as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cookie_header() {
        let jar = CookieJar::from_header(Some("sid=abc123; utm_values=%7B%22a%22%3A1%7D"));
        assert_eq!(jar.get("sid"), Some("abc123"));
        assert_eq!(jar.get("utm_values"), Some("{\"a\":1}"));
        assert_eq!(jar.get("missing"), None);
    }

    #[test]
    fn tolerates_malformed_pairs() {
        let jar = CookieJar::from_header(Some("novalue; =orphan; ok=1; broken=%G1"));
        assert_eq!(jar.get("ok"), Some("1"));
        assert_eq!(jar.get("broken"), Some("%G1"));
        assert_eq!(jar.get("novalue"), None);
    }

    #[test]
    fn encode_decode_round_trip() {
        let raw = "{\"source\":\"news letter\",\"n\":42}";
        assert_eq!(decode_value(&encode_value(raw)), raw);
    }

    #[test]
    fn later_writes_replace_earlier() {
        let mut jar = CookieJar::from_header(None);
        jar.queue_write("aid", "first");
        jar.queue_write("aid", "second");
        assert_eq!(jar.pending_writes().len(), 1);
        assert_eq!(jar.pending_writes()[0].value, "second");
    }

    #[test]
    fn set_cookie_headers_carry_attributes() {
        let mut config = CookieConfig::default();
        config.secure = true;
        let mut jar = CookieJar::from_header(None);
        jar.queue_write("aid", "abc");

        let headers = jar.set_cookie_headers(&config);
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("aid=abc; Path=/"));
        assert!(headers[0].contains("SameSite=Lax"));
        assert!(headers[0].ends_with("; Secure"));
    }

    #[test]
    fn json_cookie_round_trip() {
        let mut jar = CookieJar::from_header(None);
        let map: std::collections::BTreeMap<String, String> =
            [("checkout_flow".to_string(), "variant".to_string())].into();
        queue_json_cookie(&mut jar, "experiment_variants", &map);

        let written = &jar.pending_writes()[0];
        let rebuilt = CookieJar::from_header(Some(&format!(
            "experiment_variants={}",
            encode_value(&written.value)
        )));
        let decoded: std::collections::BTreeMap<String, String> =
            read_json_cookie(&rebuilt, "experiment_variants").unwrap();
        assert_eq!(decoded, map);
    }
}
