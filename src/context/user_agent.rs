//! User-agent classification.
//!
//! # Responsibilities
//! - Classify the raw user-agent string into browser, OS and device class
//! - Flag known crawlers and automation tools
//!
//! # Design Decisions
//! - Substring classification, no full UA grammar; the render path only
//!   needs coarse device/browser buckets
//! - Missing or malformed input yields the "unknown" profile, never an
//!   error

use serde::{Deserialize, Serialize};

/// Coarse device bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

/// Structured user-agent profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAgentProfile {
    pub browser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    pub os: String,
    pub device: DeviceClass,
    pub is_bot: bool,
}

impl Default for UserAgentProfile {
    fn default() -> Self {
        Self {
            browser: "unknown".to_string(),
            browser_version: None,
            os: "unknown".to_string(),
            device: DeviceClass::Unknown,
            is_bot: false,
        }
    }
}

const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "headlesschrome",
    "python-requests",
    "curl/",
    "wget/",
];

/// Classify a raw user-agent header value.
pub fn parse_user_agent(raw: Option<&str>) -> UserAgentProfile {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return UserAgentProfile::default();
    };
    let haystack = raw.to_lowercase();

    let is_bot = BOT_MARKERS.iter().any(|marker| haystack.contains(marker));

    let (browser, browser_version) = detect_browser(raw, &haystack);
    let os = detect_os(&haystack);
    let device = detect_device(&haystack);

    UserAgentProfile {
        browser,
        browser_version,
        os,
        device,
        is_bot,
    }
}

fn detect_browser(raw: &str, haystack: &str) -> (String, Option<String>) {
    // order matters: Edge and Opera also announce Chrome/Safari
    let candidates: &[(&str, &str)] = &[
        ("edge", "Edg/"),
        ("opera", "OPR/"),
        ("chrome", "Chrome/"),
        ("firefox", "Firefox/"),
        ("safari", "Version/"),
    ];
    for (name, marker) in candidates {
        if *name == "safari" && !haystack.contains("safari") {
            continue;
        }
        if let Some(index) = raw.find(marker) {
            let version = version_after(&raw[index + marker.len()..]);
            return (name.to_string(), version);
        }
    }
    ("unknown".to_string(), None)
}

fn version_after(rest: &str) -> Option<String> {
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    (!version.is_empty()).then_some(version)
}

fn detect_os(haystack: &str) -> String {
    if haystack.contains("windows nt") {
        "windows".to_string()
    } else if haystack.contains("iphone") || haystack.contains("ipad") {
        "ios".to_string()
    } else if haystack.contains("mac os x") {
        "macos".to_string()
    } else if haystack.contains("android") {
        "android".to_string()
    } else if haystack.contains("linux") {
        "linux".to_string()
    } else {
        "unknown".to_string()
    }
}

fn detect_device(haystack: &str) -> DeviceClass {
    if haystack.contains("ipad") || haystack.contains("tablet") {
        DeviceClass::Tablet
    } else if haystack.contains("mobile") || haystack.contains("iphone") {
        DeviceClass::Mobile
    } else if haystack.contains("windows nt")
        || haystack.contains("mac os x")
        || haystack.contains("linux")
    {
        DeviceClass::Desktop
    } else {
        DeviceClass::Unknown
    }
}
