//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status and
//!   renderer response type
//! - `gateway_render_duration_seconds` (histogram): end-to-end render
//!   latency as observed by the gateway

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(
                "gateway_requests_total",
                "Requests by method, status and renderer response type"
            );
            describe_histogram!(
                "gateway_render_duration_seconds",
                "End-to-end render latency observed by the gateway"
            );
            tracing::info!(address = %addr, "metrics exporter listening");
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to install metrics exporter");
        }
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, response_type: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "response_type" => response_type.to_string(),
    )
    .increment(1);
    histogram!(
        "gateway_render_duration_seconds",
        "response_type" => response_type.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}
