//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks serde cannot express
//! - Collect every problem in one pass instead of failing on the first
//!
//! # Checks
//! - Bind addresses parse as socket addresses
//! - The renderer endpoint is an absolute http(s) URL
//! - Timeouts are non-zero and consistent with each other
//! - Cookie names are non-empty and pairwise distinct
//! - Catalog keys are unique, domains non-empty

use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatewayConfig;

/// One semantic problem found in the configuration.
#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Run all semantic checks.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_socket_addr(&mut errors, "renderer.bind_address", &config.renderer.bind_address);
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    match Url::parse(&config.renderer.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError {
            field: "renderer.endpoint".to_string(),
            message: format!("unsupported scheme `{}`", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError {
            field: "renderer.endpoint".to_string(),
            message: e.to_string(),
        }),
    }

    if config.renderer.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "renderer.timeout_ms".to_string(),
            message: "must be non-zero".to_string(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "listener.request_timeout_secs".to_string(),
            message: "must be non-zero".to_string(),
        });
    }
    if config.listener.request_timeout_secs * 1_000 <= config.renderer.timeout_ms {
        errors.push(ValidationError {
            field: "listener.request_timeout_secs".to_string(),
            message: "must exceed renderer.timeout_ms".to_string(),
        });
    }
    if config.session.new_session_window_mins == 0 {
        errors.push(ValidationError {
            field: "session.new_session_window_mins".to_string(),
            message: "must be non-zero".to_string(),
        });
    }

    let cookie_names = [
        ("cookies.session", &config.cookies.session),
        ("cookies.analytics", &config.cookies.analytics),
        ("cookies.utm", &config.cookies.utm),
        ("cookies.last_visit", &config.cookies.last_visit),
        ("cookies.experiments", &config.cookies.experiments),
    ];
    let mut seen_names = BTreeSet::new();
    for (field, name) in cookie_names {
        if name.is_empty() {
            errors.push(ValidationError {
                field: field.to_string(),
                message: "must be non-empty".to_string(),
            });
        } else if !seen_names.insert(name.clone()) {
            errors.push(ValidationError {
                field: field.to_string(),
                message: format!("duplicate cookie name `{name}`"),
            });
        }
    }

    let mut seen_keys = BTreeSet::new();
    for experiment in &config.experiments.catalog {
        if experiment.key.is_empty() {
            errors.push(ValidationError {
                field: "experiments.catalog".to_string(),
                message: "experiment key must be non-empty".to_string(),
            });
            continue;
        }
        if !seen_keys.insert(experiment.key.clone()) {
            errors.push(ValidationError {
                field: format!("experiments.catalog.{}", experiment.key),
                message: "duplicate experiment key".to_string(),
            });
        }
        if experiment.variants.is_empty() {
            errors.push(ValidationError {
                field: format!("experiments.catalog.{}", experiment.key),
                message: "variant domain must be non-empty".to_string(),
            });
        }
        if experiment.variants.iter().any(String::is_empty) {
            errors.push(ValidationError {
                field: format!("experiments.catalog.{}", experiment.key),
                message: "variant values must be non-empty".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("`{value}` is not a valid socket address"),
        });
    }
}
