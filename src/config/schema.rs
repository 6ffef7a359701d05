//! Configuration schema definitions.
//!
//! The complete configuration for gateway and renderer. All types derive
//! Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public listener (gateway process).
    pub listener: ListenerConfig,

    /// Internal renderer process and the hop to it.
    pub renderer: RendererConfig,

    /// Names and attributes of the cookies this service owns.
    pub cookies: CookieConfig,

    /// Analytics session tracking.
    pub session: SessionConfig,

    /// Live experiment catalog.
    pub experiments: ExperimentsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Public listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g. "0.0.0.0:8080").
    pub bind_address: String,

    /// Total request timeout in seconds. Must exceed the renderer hop
    /// timeout or the outer layer cuts off the inner one's error mapping.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Renderer process and hop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Render endpoint the gateway forwards to.
    pub endpoint: String,

    /// Bind address of the renderer process.
    pub bind_address: String,

    /// Hop timeout in milliseconds. Exceeding it is a transport failure.
    pub timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9400/render".to_string(),
            bind_address: "127.0.0.1:9400".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// Cookie names and attributes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Opaque session token consumed for account lookup.
    pub session: String,

    /// Analytics session id.
    pub analytics: String,

    /// Stored UTM value set (JSON).
    pub utm: String,

    /// Last-visit unix timestamp.
    pub last_visit: String,

    /// Experiment assignment map (JSON).
    pub experiments: String,

    pub path: String,
    pub secure: bool,
    pub max_age_days: u32,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            session: "session_token".to_string(),
            analytics: "analytics_session_id".to_string(),
            utm: "utm_values".to_string(),
            last_visit: "last_visit_at".to_string(),
            experiments: "experiment_variants".to_string(),
            path: "/".to_string(),
            secure: false,
            max_age_days: 365,
        }
    }
}

/// Analytics session tracking.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minutes of inactivity after which a visit counts as a new session.
    pub new_session_window_mins: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            new_session_window_mins: 30,
        }
    }
}

/// Experiment catalog section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExperimentsConfig {
    pub catalog: Vec<ExperimentConfig>,
}

/// One live experiment declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub key: String,
    pub variants: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
