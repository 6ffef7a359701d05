//! State serialization for transport to the browser.
//!
//! # Responsibilities
//! - Strip dynamic/derived keys at every depth
//! - Encode the remainder as JSON
//! - Escape characters that could terminate an inline script early
//!
//! # Design Decisions
//! - Arrays and non-object values pass through untouched; only plain
//!   objects are walked
//! - Escapes stay inside JSON string-escape syntax (`\uXXXX`), so the
//!   payload parses back with any JSON parser and the round trip is exact

use serde_json::{Map, Value};

use crate::state::tree::is_dynamic_key;

/// Global identifier the gateway assigns the payload to, read once by the
/// client resume step.
pub const STATE_GLOBAL: &str = "__SSR_STATE__";

/// Produce the escaped transport string for a committed state snapshot.
pub fn serialize_state(root: &Value) -> Result<String, serde_json::Error> {
    let stripped = strip_dynamic(root);
    let json = serde_json::to_string(&stripped)?;
    Ok(escape_for_inline_script(&json))
}

/// Recursively drop `$`-prefixed keys from plain objects.
pub fn strip_dynamic(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                if is_dynamic_key(key) {
                    continue;
                }
                out.insert(key.clone(), strip_dynamic(child));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Escape characters that can break out of an embedding context.
///
/// `<`, `>` and `&` cover `</script>` and comment injection; U+2028 and
/// U+2029 are line terminators in JavaScript source but not in JSON.
pub fn escape_for_inline_script(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}
