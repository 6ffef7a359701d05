//! UTM attribution resolution.
//!
//! # Responsibilities
//! - Parse `utm_*` parameters out of the raw query string
//! - Prefer query values over a previously stored cookie set
//! - Keep the first occurrence when a parameter is duplicated
//! - Decide whether the cookie needs rewriting
//!
//! # Design Decisions
//! - A query carrying any `utm_*` parameter replaces the whole stored
//!   set; attribution sets are not merged across campaigns
//! - The cookie is rewritten only when the computed values differ from
//!   what is stored, or duplicates were flattened

use serde::{Deserialize, Serialize};

/// The five standard UTM attribution fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtmValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl UtmValues {
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.medium.is_none()
            && self.campaign.is_none()
            && self.term.is_none()
            && self.content.is_none()
    }
}

/// Outcome of UTM resolution for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct UtmResolution {
    pub values: UtmValues,
    pub write_cookie: bool,
}

/// Resolve UTM values from the query string and the stored cookie set.
pub fn resolve_utm(query: Option<&str>, stored: Option<&UtmValues>) -> UtmResolution {
    let mut from_query = UtmValues::default();
    let mut duplicates_flattened = false;

    for (key, value) in parse_query_pairs(query.unwrap_or("")) {
        let slot = match key.as_str() {
            "utm_source" => &mut from_query.source,
            "utm_medium" => &mut from_query.medium,
            "utm_campaign" => &mut from_query.campaign,
            "utm_term" => &mut from_query.term,
            "utm_content" => &mut from_query.content,
            _ => continue,
        };
        if slot.is_some() {
            // first occurrence wins
            duplicates_flattened = true;
        } else {
            *slot = Some(value);
        }
    }

    if from_query.is_empty() {
        return UtmResolution {
            values: stored.cloned().unwrap_or_default(),
            write_cookie: false,
        };
    }

    let differs = stored.map(|s| *s != from_query).unwrap_or(true);
    UtmResolution {
        values: from_query,
        write_cookie: differs || duplicates_flattened,
    }
}

/// Decode a raw query string into ordered key/value pairs.
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    crate::context::cookies::decode_value(&raw.replace('+', " "))
}
