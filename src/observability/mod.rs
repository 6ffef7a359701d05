//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway and renderer produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (request counters, render latency histogram)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The request id flows through every log line on the request path
//! - Metric updates are cheap (atomic increments); recording happens on
//!   every exit path of the gateway handler

pub mod logging;
pub mod metrics;
